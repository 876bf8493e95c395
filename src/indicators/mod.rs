//! Financial indicators over a payment schedule: NPV, IRR and TCEA

mod irr;

pub use irr::{irr, npv, IRR_TOLERANCE, MAX_IRR_ITERATIONS};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::schedule::PaymentSchedule;

/// Indicators for a single simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialIndicators {
    /// Net present value at the discount rate
    pub npv: f64,
    /// Monthly internal rate of return (decimal)
    pub irr: f64,
    /// Annualized effective cost in percent
    pub tcea: f64,
}

/// Cash flows seen from the lender: the disbursement at t = 0, then every
/// period's total payment
pub fn cash_flows(schedule: &[PaymentSchedule], amount_to_finance: f64) -> Vec<f64> {
    std::iter::once(-amount_to_finance)
        .chain(schedule.iter().map(|row| row.total_payment))
        .collect()
}

/// Annual effective cost (percent) of a monthly IRR
pub fn tcea(monthly_irr: f64) -> f64 {
    ((1.0 + monthly_irr).powi(12) - 1.0) * 100.0
}

/// Compute NPV at the monthly `discount_rate`, the monthly IRR and TCEA
pub fn compute_indicators(
    schedule: &[PaymentSchedule],
    amount_to_finance: f64,
    discount_rate: f64,
) -> Result<FinancialIndicators> {
    if !discount_rate.is_finite() || discount_rate <= -1.0 {
        return Err(SimulationError::InvalidRate(format!(
            "discount rate {} must be greater than -1",
            discount_rate
        )));
    }

    let flows = cash_flows(schedule, amount_to_finance);
    let npv = npv(&flows, discount_rate);
    let irr = irr(&flows, discount_rate)?;
    let tcea = tcea(irr);

    debug!("indicators: npv {:.2}, irr {:.8}, tcea {:.4}%", npv, irr, tcea);

    Ok(FinancialIndicators { npv, irr, tcea })
}
