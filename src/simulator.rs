//! Simulation orchestration
//!
//! Holds the bank configurations once, then turns any number of requests into
//! simulations without re-reading CSV files.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bank::{load_banks, resolve_subsidies, BankConfig};
use crate::error::{Result, SimulationError};
use crate::indicators::{cash_flows, compute_indicators, npv};
use crate::rates::{effective_annual_to_monthly, to_effective_monthly_rate};
use crate::schedule::{AmortizationCalculator, PaymentSchedule, PeriodType, ScheduleConfig, ScheduleTotals};
use crate::simulation::{Simulation, SimulationInput, SimulationStatus, DEFAULT_DESGRAVAMEN_RATE};

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub schedule: ScheduleConfig,

    /// Fail the simulation when the IRR solver does not converge.
    /// When false, `irr` and `tcea` are left empty instead.
    pub require_indicators: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            require_indicators: true,
        }
    }
}

/// A calculated simulation together with its schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub simulation: Simulation,
    pub schedule: Vec<PaymentSchedule>,
}

/// Pre-loaded simulator for single and batch simulations
///
/// # Example
/// ```ignore
/// let simulator = Simulator::from_csv("data/bank_entities.csv")?;
/// let outcome = simulator.calculate(&input)?;
/// println!("{:.2}", outcome.simulation.monthly_payment);
/// ```
#[derive(Debug, Clone)]
pub struct Simulator {
    banks: HashMap<u32, BankConfig>,
    default_bank: BankConfig,
    config: SimulatorConfig,
}

impl Simulator {
    /// Simulator with only the default NCMV bank
    pub fn new() -> Self {
        Self {
            banks: HashMap::new(),
            default_bank: BankConfig::default_ncmv(),
            config: SimulatorConfig::default(),
        }
    }

    /// Simulator over a pre-built set of banks
    pub fn with_banks(banks: HashMap<u32, BankConfig>) -> Self {
        Self {
            banks,
            ..Self::new()
        }
    }

    /// Simulator loading bank entities from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::with_banks(load_banks(path)?))
    }

    pub fn with_config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Bank configuration for an entity id, falling back to the default NCMV bank
    pub fn bank(&self, bank_entity_id: u32) -> &BankConfig {
        self.banks.get(&bank_entity_id).unwrap_or_else(|| {
            debug!("bank {} not configured, using {}", bank_entity_id, self.default_bank.name);
            &self.default_bank
        })
    }

    /// Calculate a DRAFT simulation and its payment schedule
    pub fn calculate(&self, input: &SimulationInput) -> Result<SimulationOutcome> {
        input.validate()?;

        let bank = self.bank(input.bank_entity_id);
        let resolved = with_bank_defaults(input, bank);
        let input: &SimulationInput = &resolved;

        let annual_rate = input.annual_rate.unwrap_or(bank.current_rate);
        let monthly_rate = to_effective_monthly_rate(annual_rate, input.interest_rate_type, input.capitalization)?;

        let subsidies = resolve_subsidies(input, bank)?;
        let amount_to_finance = input.amount_to_finance(&subsidies);

        if amount_to_finance <= 0.0 {
            return Err(SimulationError::validation(
                "downPayment",
                format!(
                    "down payment {:.2} plus subsidies {:.2} must be less than the property price {:.2}",
                    input.down_payment,
                    subsidies.total(),
                    input.property_price
                ),
            ));
        }

        if let Some(max_pct) = bank.max_coverage_pct {
            let coverage_pct = amount_to_finance / input.property_price * 100.0;
            if coverage_pct > max_pct {
                return Err(SimulationError::validation(
                    "amountToFinance",
                    format!(
                        "{:.2}% of the property price exceeds the {:.2}% financed by {}",
                        coverage_pct, max_pct, bank.name
                    ),
                ));
            }
        }

        debug!(
            "client {} at bank {}: financing {:.2} at monthly rate {:.8}",
            input.client_id, bank.id, amount_to_finance, monthly_rate
        );

        let calculator = AmortizationCalculator::new(self.config.schedule.clone());
        let schedule = calculator.generate_schedule(input, monthly_rate, amount_to_finance)?;

        let discount_rate = input
            .discount_rate
            .map(|pct| effective_annual_to_monthly(pct / 100.0))
            .unwrap_or(monthly_rate);

        let (npv_value, irr, tcea) = self.indicators(input.client_id, &schedule, amount_to_finance, discount_rate)?;

        let first_ordinary = schedule
            .iter()
            .find(|row| row.period_type == PeriodType::Ordinary)
            .ok_or_else(|| SimulationError::ArithmeticInvariant("schedule has no ordinary period".to_string()))?;

        let totals = ScheduleTotals::from_schedule(&schedule);
        let total_additional_costs = input.upfront_costs();

        let currency = input.currency;
        let alternate_currency = input.exchange_rate.map(|_| currency.alternate());

        let simulation = Simulation {
            input: input.clone(),
            amount_to_finance,
            resolved_bonus_amount: subsidies.government_bonus,
            pbp_amount: subsidies.pbp_amount,
            monthly_rate,
            monthly_payment: first_ordinary.payment,
            total_monthly_payment: first_ordinary.total_payment,
            total_amount_to_pay: totals.grand_total + total_additional_costs,
            total_interest: totals.total_interest,
            total_additional_costs,
            loan_term_months: input.loan_term_months(),
            total_life_insurance: totals.total_life_insurance,
            total_property_insurance: totals.total_property_insurance,
            total_desgravamen_insurance: totals.total_desgravamen_insurance,
            npv: npv_value,
            irr,
            tcea,
            exchange_rate_used: input.exchange_rate,
            alternate_currency,
            alternate_currency_symbol: alternate_currency.map(|c| c.symbol().to_string()),
            property_price_alternate: input
                .exchange_rate
                .map(|rate| currency.to_alternate(input.property_price, rate)),
            monthly_payment_alternate: input
                .exchange_rate
                .map(|rate| currency.to_alternate(first_ordinary.payment, rate)),
            status: SimulationStatus::Draft,
        };

        Ok(SimulationOutcome { simulation, schedule })
    }

    /// NPV, IRR and TCEA; without `require_indicators` a non-converging IRR
    /// leaves IRR and TCEA empty and keeps the NPV
    fn indicators(
        &self,
        client_id: u32,
        schedule: &[PaymentSchedule],
        amount_to_finance: f64,
        discount_rate: f64,
    ) -> Result<(f64, Option<f64>, Option<f64>)> {
        match compute_indicators(schedule, amount_to_finance, discount_rate) {
            Ok(indicators) => Ok((indicators.npv, Some(indicators.irr), Some(indicators.tcea))),
            Err(SimulationError::NoConvergence { iterations, last_npv }) if !self.config.require_indicators => {
                warn!(
                    "IRR did not converge for client {} ({} iterations, last NPV {:.4}); omitting IRR and TCEA",
                    client_id, iterations, last_npv
                );
                Ok((npv(&cash_flows(schedule, amount_to_finance), discount_rate), None, None))
            }
            Err(e) => Err(e),
        }
    }

    /// Calculate independent simulations in parallel, preserving input order
    pub fn run_batch(&self, inputs: &[SimulationInput]) -> Vec<Result<SimulationOutcome>> {
        let results: Vec<_> = inputs.par_iter().map(|input| self.calculate(input)).collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!("batch of {} simulations: {} ok, {} failed", inputs.len(), inputs.len() - failed, failed);

        results
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill in what the request leaves to its bank: the annual rate and the
/// desgravamen rate, falling back to `DEFAULT_DESGRAVAMEN_RATE`
fn with_bank_defaults<'a>(input: &'a SimulationInput, bank: &BankConfig) -> Cow<'a, SimulationInput> {
    if input.annual_rate.is_some() && input.desgravamen_rate.is_some() {
        return Cow::Borrowed(input);
    }

    let mut resolved = input.clone();
    if resolved.annual_rate.is_none() {
        debug!("client {} takes the {:.4}% rate of {}", input.client_id, bank.current_rate, bank.name);
        resolved.annual_rate = Some(bank.current_rate);
    }
    if resolved.desgravamen_rate.is_none() {
        resolved.desgravamen_rate = Some(bank.desgravamen_rate.unwrap_or(DEFAULT_DESGRAVAMEN_RATE));
    }
    Cow::Owned(resolved)
}
