//! French-method amortization schedule generation

use chrono::Months;
use log::debug;

use super::grace::classify;
use super::row::PaymentSchedule;
use super::state::ScheduleState;
use super::{GracePeriodType, PeriodType};
use crate::error::{Result, SimulationError};
use crate::simulation::{SimulationInput, MAX_TERM_YEARS};

/// Tolerance used when checking monetary identities inside a schedule
const IDENTITY_TOLERANCE: f64 = 1e-6;

/// Configuration for schedule generation
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Round every monetary column to cents, period by period
    pub round_to_cents: bool,

    /// Charge insurance premiums during total grace periods
    pub insurance_during_total_grace: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            round_to_cents: false,
            insurance_during_total_grace: true,
        }
    }
}

/// Constant installment that amortizes `balance` over `months` at `rate`
pub fn french_payment(balance: f64, rate: f64, months: u32) -> f64 {
    if months == 0 {
        return balance;
    }
    if rate.abs() < 1e-15 {
        return balance / months as f64;
    }
    balance * rate / (1.0 - (1.0 + rate).powi(-(months as i32)))
}

/// Main amortization calculator
#[derive(Debug, Clone, Default)]
pub struct AmortizationCalculator {
    config: ScheduleConfig,
}

impl AmortizationCalculator {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Generate the full monthly schedule for a loan of `amount_to_finance`
    /// at the effective `monthly_rate`.
    ///
    /// Every input check runs before the first period is generated, so either
    /// a complete schedule or an error is returned.
    pub fn generate_schedule(
        &self,
        input: &SimulationInput,
        monthly_rate: f64,
        amount_to_finance: f64,
    ) -> Result<Vec<PaymentSchedule>> {
        check_inputs(input, monthly_rate, amount_to_finance)?;

        let loan_term_months = input.loan_term_months();
        let property_premium = self.money(input.property_insurance.monthly_premium(input.property_price));

        let mut state = ScheduleState::new(amount_to_finance);
        let mut schedule = Vec::with_capacity(loan_term_months as usize);

        for _ in 0..loan_term_months {
            let row = self.calculate_period(input, monthly_rate, property_premium, &mut state)?;
            state.advance(row.period_type, row.final_balance);
            schedule.push(row);
        }

        self.absorb_residual(&mut schedule)?;
        verify_schedule(&schedule)?;

        Ok(schedule)
    }

    /// Calculate one period from the running state
    fn calculate_period(
        &self,
        input: &SimulationInput,
        monthly_rate: f64,
        property_premium: f64,
        state: &mut ScheduleState,
    ) -> Result<PaymentSchedule> {
        let index = state.period_index;
        let period_type = classify(index, input.grace_months, input.grace_period_type);
        let initial_balance = state.balance;
        let interest = self.money(initial_balance * monthly_rate);

        let (payment, principal, final_balance) = match period_type {
            // Interest capitalizes onto the balance
            PeriodType::TotalGrace => (0.0, 0.0, initial_balance + interest),
            PeriodType::PartialGrace => (interest, 0.0, initial_balance),
            PeriodType::Ordinary => {
                let installment = match state.installment {
                    Some(installment) => installment,
                    None => {
                        let remaining = state.remaining_months(input.loan_term_months());
                        let installment = self.money(french_payment(initial_balance, monthly_rate, remaining));
                        debug!(
                            "period {}: installment {:.2} over {} remaining months on balance {:.2} (after {:?})",
                            index + 1,
                            installment,
                            remaining,
                            initial_balance,
                            state.last_period_type
                        );
                        state.installment = Some(installment);
                        installment
                    }
                };
                let principal = installment - interest;
                (installment, principal, self.money(initial_balance - principal))
            }
        };

        let charge_insurance = period_type != PeriodType::TotalGrace || self.config.insurance_during_total_grace;
        let premium = |rate: f64| if charge_insurance { self.money(initial_balance * rate) } else { 0.0 };

        let life_insurance = premium(input.life_insurance_rate);
        let property_insurance = if charge_insurance { property_premium } else { 0.0 };
        let desgravamen_insurance = input.desgravamen_rate.map(premium);

        let payment_date = input
            .start_date
            .checked_add_months(Months::new(index + 1))
            .ok_or_else(|| SimulationError::validation("startDate", "payment dates overflow the calendar"))?;

        Ok(PaymentSchedule {
            payment_number: index + 1,
            payment_date,
            initial_balance,
            payment,
            principal,
            interest,
            final_balance,
            life_insurance,
            property_insurance,
            desgravamen_insurance,
            total_payment: payment + life_insurance + property_insurance + desgravamen_insurance.unwrap_or(0.0),
            period_type,
        })
    }

    /// Fold the leftover balance of the last period into its principal so the
    /// loan closes at exactly zero
    fn absorb_residual(&self, schedule: &mut [PaymentSchedule]) -> Result<()> {
        let last = schedule
            .last_mut()
            .ok_or_else(|| SimulationError::ArithmeticInvariant("empty schedule".to_string()))?;

        let residual = last.final_balance;
        if !residual.is_finite() || residual.abs() > last.payment.abs().max(1.0) {
            return Err(SimulationError::ArithmeticInvariant(format!(
                "residual balance {} after period {} exceeds the installment {}",
                residual, last.payment_number, last.payment
            )));
        }

        if residual != 0.0 {
            debug!("absorbing residual {:e} into period {}", residual, last.payment_number);
            last.principal += residual;
            last.payment = last.principal + last.interest;
            last.final_balance = 0.0;
            last.total_payment = last.payment + last.insurance();
        }

        Ok(())
    }

    fn money(&self, amount: f64) -> f64 {
        if self.config.round_to_cents {
            (amount * 100.0).round() / 100.0
        } else {
            amount
        }
    }
}

/// Generate a schedule with the default configuration
pub fn generate_schedule(
    input: &SimulationInput,
    monthly_rate: f64,
    amount_to_finance: f64,
) -> Result<Vec<PaymentSchedule>> {
    AmortizationCalculator::default().generate_schedule(input, monthly_rate, amount_to_finance)
}

fn check_inputs(input: &SimulationInput, monthly_rate: f64, amount_to_finance: f64) -> Result<()> {
    if input.term_years < 1 || input.term_years > MAX_TERM_YEARS {
        return Err(SimulationError::validation(
            "termYears",
            format!("{} must be between 1 and {}", input.term_years, MAX_TERM_YEARS),
        ));
    }
    if !monthly_rate.is_finite() || monthly_rate < 0.0 {
        return Err(SimulationError::InvalidRate(format!(
            "monthly rate {} must be a non-negative number",
            monthly_rate
        )));
    }
    if !amount_to_finance.is_finite() || amount_to_finance <= 0.0 {
        return Err(SimulationError::validation(
            "amountToFinance",
            format!("{:.2} must be greater than 0", amount_to_finance),
        ));
    }
    if input.grace_period_type != GracePeriodType::None && input.grace_months >= input.loan_term_months() {
        return Err(SimulationError::validation(
            "graceMonths",
            format!("{} must be shorter than the {}-month term", input.grace_months, input.loan_term_months()),
        ));
    }
    if input
        .start_date
        .checked_add_months(Months::new(input.loan_term_months()))
        .is_none()
    {
        return Err(SimulationError::validation("startDate", "payment dates overflow the calendar"));
    }
    Ok(())
}

/// Check the structural invariants of a generated schedule
pub fn verify_schedule(schedule: &[PaymentSchedule]) -> Result<()> {
    let invariant = |msg: String| Err(SimulationError::ArithmeticInvariant(msg));

    let Some(last) = schedule.last() else {
        return invariant("empty schedule".to_string());
    };

    for (i, row) in schedule.iter().enumerate() {
        if row.payment_number as usize != i + 1 {
            return invariant(format!("row {} carries payment number {}", i + 1, row.payment_number));
        }

        let values = [
            row.initial_balance,
            row.payment,
            row.principal,
            row.interest,
            row.final_balance,
            row.life_insurance,
            row.property_insurance,
            row.desgravamen_insurance.unwrap_or(0.0),
            row.total_payment,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return invariant(format!("period {} has a non-finite amount", row.payment_number));
        }

        if row.final_balance < -0.01 {
            return invariant(format!("period {} overpays to {}", row.payment_number, row.final_balance));
        }

        if (row.total_payment - (row.payment + row.insurance())).abs() > IDENTITY_TOLERANCE {
            return invariant(format!(
                "period {} total {} differs from payment plus insurance {}",
                row.payment_number,
                row.total_payment,
                row.payment + row.insurance()
            ));
        }

        if let Some(next) = schedule.get(i + 1) {
            if row.final_balance != next.initial_balance {
                return invariant(format!(
                    "period {} closes at {} but period {} opens at {}",
                    row.payment_number, row.final_balance, next.payment_number, next.initial_balance
                ));
            }
        }
    }

    if last.final_balance != 0.0 {
        return invariant(format!("final balance {} is not zero", last.final_balance));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::{to_effective_monthly_rate, InterestRateType};
    use crate::simulation::PropertyInsurance;
    use approx::assert_relative_eq;

    fn sample_rate() -> f64 {
        to_effective_monthly_rate(9.0, InterestRateType::Effective, None).unwrap()
    }

    #[test]
    fn test_french_payment() {
        let rate = sample_rate();
        assert_relative_eq!(french_payment(240_000.0, rate, 240), 2105.4316, epsilon = 1e-3);
        assert_eq!(french_payment(1200.0, 0.0, 12), 100.0);
        assert_eq!(french_payment(500.0, 0.01, 0), 500.0);
    }

    #[test]
    fn test_reference_scenario() {
        let input = SimulationInput::sample();
        let rate = sample_rate();
        let schedule = generate_schedule(&input, rate, 240_000.0).unwrap();

        assert_eq!(schedule.len(), 240);
        assert_relative_eq!(schedule[0].payment, 2105.4316, epsilon = 1e-3);
        assert_relative_eq!(schedule[0].interest, 240_000.0 * rate, epsilon = 1e-9);
        assert_eq!(schedule[0].payment_date, chrono::NaiveDate::from_ymd_opt(2025, 2, 15).unwrap());
        assert_eq!(schedule[239].payment_date, chrono::NaiveDate::from_ymd_opt(2045, 1, 15).unwrap());
        assert!(schedule.iter().all(|r| r.period_type == PeriodType::Ordinary));
    }

    #[test]
    fn test_balances_chain_and_close_at_zero() {
        let input = SimulationInput::sample();
        let schedule = generate_schedule(&input, sample_rate(), 240_000.0).unwrap();

        for pair in schedule.windows(2) {
            assert_eq!(pair[0].final_balance, pair[1].initial_balance);
        }
        assert_eq!(schedule.last().unwrap().final_balance, 0.0);
        assert_eq!(schedule[0].initial_balance, 240_000.0);
    }

    #[test]
    fn test_principal_sums_to_amount() {
        let input = SimulationInput::sample();
        let schedule = generate_schedule(&input, sample_rate(), 240_000.0).unwrap();

        let total_principal: f64 = schedule.iter().map(|r| r.principal).sum();
        assert!((total_principal - 240_000.0).abs() < 0.01);
    }

    #[test]
    fn test_payment_constant_across_ordinary_periods() {
        let input = SimulationInput::sample();
        let schedule = generate_schedule(&input, sample_rate(), 240_000.0).unwrap();

        let first = schedule[0].payment;
        let (last, body) = schedule.split_last().unwrap();
        assert!(body.iter().all(|r| r.payment == first));
        // The last installment only differs by the absorbed residual
        assert!((last.payment - first).abs() < 1e-6);
    }

    #[test]
    fn test_total_payment_identity() {
        let mut input = SimulationInput::sample();
        input.property_insurance = PropertyInsurance::Flat(45.0);
        let schedule = generate_schedule(&input, sample_rate(), 240_000.0).unwrap();

        for row in &schedule {
            let expected = row.payment
                + row.life_insurance
                + row.property_insurance
                + row.desgravamen_insurance.unwrap_or(0.0);
            assert!((row.total_payment - expected).abs() < 1e-9);
            assert_eq!(row.property_insurance, 45.0);
        }
    }

    #[test]
    fn test_declining_balance_insurance() {
        let mut input = SimulationInput::sample();
        input.property_insurance = PropertyInsurance::Rate(0.0003);
        let schedule = generate_schedule(&input, sample_rate(), 240_000.0).unwrap();

        let first = &schedule[0];
        assert_relative_eq!(first.life_insurance, 240_000.0 * 0.0005, epsilon = 1e-9);
        assert_relative_eq!(first.desgravamen_insurance.unwrap(), 240_000.0 * 0.00049, epsilon = 1e-9);
        assert_relative_eq!(first.property_insurance, 300_000.0 * 0.0003, epsilon = 1e-9);

        // Premiums follow the balance down
        assert!(schedule[100].life_insurance < first.life_insurance);
        assert_eq!(schedule[100].property_insurance, first.property_insurance);
    }

    #[test]
    fn test_no_desgravamen_rate() {
        let mut input = SimulationInput::sample();
        input.desgravamen_rate = None;
        let schedule = generate_schedule(&input, sample_rate(), 240_000.0).unwrap();
        assert!(schedule.iter().all(|r| r.desgravamen_insurance.is_none()));
    }

    #[test]
    fn test_term_boundaries() {
        let mut input = SimulationInput::sample();
        input.term_years = 1;
        assert_eq!(generate_schedule(&input, sample_rate(), 100_000.0).unwrap().len(), 12);

        input.term_years = 30;
        assert_eq!(generate_schedule(&input, sample_rate(), 100_000.0).unwrap().len(), 360);
    }

    #[test]
    fn test_zero_grace_months_has_no_grace_rows() {
        let rate = sample_rate();
        for grace_type in [GracePeriodType::None, GracePeriodType::Total, GracePeriodType::Partial] {
            let mut input = SimulationInput::sample();
            input.grace_period_type = grace_type;
            input.grace_months = 0;
            let schedule = generate_schedule(&input, rate, 240_000.0).unwrap();
            assert!(schedule.iter().all(|r| !r.period_type.is_grace()));
        }
    }

    #[test]
    fn test_total_grace_capitalizes() {
        let mut input = SimulationInput::sample();
        input.grace_period_type = GracePeriodType::Total;
        input.grace_months = 3;
        let rate = sample_rate();
        let schedule = generate_schedule(&input, rate, 240_000.0).unwrap();

        for row in &schedule[..3] {
            assert_eq!(row.period_type, PeriodType::TotalGrace);
            assert_eq!(row.principal, 0.0);
            assert_eq!(row.payment, 0.0);
            assert!(row.life_insurance > 0.0);
        }

        let grown = 240_000.0 * (1.0 + rate).powi(3);
        assert_relative_eq!(schedule[2].final_balance, grown, epsilon = 1e-6);

        // Period 4 amortizes the grown balance over the remaining 237 months
        let fourth = &schedule[3];
        assert_eq!(fourth.period_type, PeriodType::Ordinary);
        assert_relative_eq!(fourth.payment, french_payment(grown, rate, 237), epsilon = 1e-6);
        assert_relative_eq!(fourth.payment, 2161.5077, epsilon = 1e-3);
        assert!(schedule[3..schedule.len() - 1].iter().all(|r| r.payment == fourth.payment));
        assert_eq!(schedule.last().unwrap().final_balance, 0.0);
    }

    #[test]
    fn test_total_grace_without_insurance() {
        let mut input = SimulationInput::sample();
        input.grace_period_type = GracePeriodType::Total;
        input.grace_months = 2;
        let calculator = AmortizationCalculator::new(ScheduleConfig {
            insurance_during_total_grace: false,
            ..Default::default()
        });
        let schedule = calculator.generate_schedule(&input, sample_rate(), 240_000.0).unwrap();

        assert_eq!(schedule[0].total_payment, 0.0);
        assert_eq!(schedule[1].desgravamen_insurance, Some(0.0));
        assert!(schedule[2].total_payment > 0.0);
    }

    #[test]
    fn test_partial_grace_pays_interest_only() {
        let mut input = SimulationInput::sample();
        input.grace_period_type = GracePeriodType::Partial;
        input.grace_months = 6;
        let rate = sample_rate();
        let schedule = generate_schedule(&input, rate, 240_000.0).unwrap();

        for row in &schedule[..6] {
            assert_eq!(row.period_type, PeriodType::PartialGrace);
            assert_eq!(row.principal, 0.0);
            assert_eq!(row.payment, row.interest);
            assert_eq!(row.final_balance, 240_000.0);
        }

        assert_relative_eq!(schedule[6].payment, french_payment(240_000.0, rate, 234), epsilon = 1e-9);
        let total_principal: f64 = schedule.iter().map(|r| r.principal).sum();
        assert!((total_principal - 240_000.0).abs() < 0.01);
    }

    #[test]
    fn test_idempotent() {
        let mut input = SimulationInput::sample();
        input.grace_period_type = GracePeriodType::Total;
        input.grace_months = 4;
        let rate = sample_rate();

        let a = generate_schedule(&input, rate, 240_000.0).unwrap();
        let b = generate_schedule(&input, rate, 240_000.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rounded_schedule_closes_at_zero() {
        let calculator = AmortizationCalculator::new(ScheduleConfig {
            round_to_cents: true,
            ..Default::default()
        });
        let mut input = SimulationInput::sample();
        input.term_years = 30;
        let schedule = calculator.generate_schedule(&input, sample_rate(), 240_000.0).unwrap();

        for row in &schedule[..schedule.len() - 1] {
            assert_eq!(row.interest, (row.interest * 100.0).round() / 100.0);
            assert_eq!(row.payment, schedule[0].payment);
        }
        assert_eq!(schedule.last().unwrap().final_balance, 0.0);

        let total_principal: f64 = schedule.iter().map(|r| r.principal).sum();
        assert!((total_principal - 240_000.0).abs() < 0.01);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let input = SimulationInput::sample();
        let rate = sample_rate();

        assert!(matches!(
            generate_schedule(&input, rate, 0.0),
            Err(SimulationError::Validation { field: "amountToFinance", .. })
        ));
        assert!(matches!(
            generate_schedule(&input, -0.01, 240_000.0),
            Err(SimulationError::InvalidRate(_))
        ));
        assert!(matches!(
            generate_schedule(&input, f64::NAN, 240_000.0),
            Err(SimulationError::InvalidRate(_))
        ));

        let mut long = SimulationInput::sample();
        long.term_years = 31;
        assert!(matches!(
            generate_schedule(&long, rate, 240_000.0),
            Err(SimulationError::Validation { field: "termYears", .. })
        ));
    }

    #[test]
    fn test_verify_detects_broken_chain() {
        let input = SimulationInput::sample();
        let mut schedule = generate_schedule(&input, sample_rate(), 240_000.0).unwrap();
        assert!(verify_schedule(&schedule).is_ok());

        schedule[10].final_balance += 1.0;
        assert!(matches!(
            verify_schedule(&schedule),
            Err(SimulationError::ArithmeticInvariant(_))
        ));
        assert!(matches!(verify_schedule(&[]), Err(SimulationError::ArithmeticInvariant(_))));
    }
}
