//! Net present value and internal rate of return
//!
//! Rates here are periodic (monthly); annualizing is left to the caller.

use crate::error::{Result, SimulationError};

/// Solver stops once successive estimates move less than this
pub const IRR_TOLERANCE: f64 = 1e-7;

/// Iteration budget for each solver stage
pub const MAX_IRR_ITERATIONS: u32 = 100;

/// Periodic rate search interval
const RATE_FLOOR: f64 = -0.99;
const RATE_CEILING: f64 = 10.0;

/// Net present value of periodic cash flows, `cash_flows[0]` undiscounted
pub fn npv(cash_flows: &[f64], rate: f64) -> f64 {
    let growth = 1.0 + rate;
    let mut discount = 1.0;
    let mut total = 0.0;
    for &cf in cash_flows {
        total += cf / discount;
        discount *= growth;
    }
    total
}

/// NPV and its derivative with respect to the rate
fn npv_and_derivative(cash_flows: &[f64], rate: f64) -> (f64, f64) {
    let mut value = 0.0;
    let mut derivative = 0.0;

    for (t, &cf) in cash_flows.iter().enumerate() {
        let discount = (1.0 + rate).powi(t as i32);
        value += cf / discount;
        if t > 0 {
            derivative -= (t as f64) * cf / (discount * (1.0 + rate));
        }
    }

    (value, derivative)
}

/// Periodic internal rate of return.
///
/// Newton-Raphson starting from `guess`, clamped to [-0.99, 10]; falls back
/// to bisection over the same interval when Newton stalls or runs out of
/// iterations.
pub fn irr(cash_flows: &[f64], guess: f64) -> Result<f64> {
    let has_positive = cash_flows.iter().any(|&cf| cf > 0.0);
    let has_negative = cash_flows.iter().any(|&cf| cf < 0.0);
    if !has_positive || !has_negative {
        return Err(SimulationError::NoConvergence {
            iterations: 0,
            last_npv: npv(cash_flows, guess),
        });
    }

    let mut rate = if guess.is_finite() {
        guess.clamp(RATE_FLOOR, RATE_CEILING)
    } else {
        0.0
    };

    for _ in 0..MAX_IRR_ITERATIONS {
        let (value, derivative) = npv_and_derivative(cash_flows, rate);

        if !derivative.is_finite() || derivative.abs() < 1e-20 {
            break;
        }

        let next = (rate - value / derivative).clamp(RATE_FLOOR, RATE_CEILING);
        if !next.is_finite() {
            break;
        }
        if (next - rate).abs() < IRR_TOLERANCE {
            return Ok(next);
        }
        rate = next;
    }

    irr_bisection(cash_flows)
}

fn irr_bisection(cash_flows: &[f64]) -> Result<f64> {
    let mut low = RATE_FLOOR;
    let mut high = RATE_CEILING;
    let npv_low = npv(cash_flows, low);
    let npv_high = npv(cash_flows, high);

    if npv_low.is_nan() || npv_high.is_nan() || npv_low.signum() == npv_high.signum() {
        return Err(SimulationError::NoConvergence {
            iterations: 0,
            last_npv: npv_high,
        });
    }

    let low_sign = npv_low.signum();
    let mut last_npv = npv_high;

    for _ in 0..MAX_IRR_ITERATIONS {
        let mid = (low + high) / 2.0;
        last_npv = npv(cash_flows, mid);

        if last_npv.abs() < IRR_TOLERANCE || (high - low) / 2.0 < IRR_TOLERANCE {
            return Ok(mid);
        }

        if last_npv.signum() == low_sign {
            low = mid;
        } else {
            high = mid;
        }
    }

    Err(SimulationError::NoConvergence {
        iterations: MAX_IRR_ITERATIONS,
        last_npv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_simple_irr() {
        // 1000 out, 1100 back after twelve months
        let mut cash_flows = vec![-1000.0];
        cash_flows.extend(vec![0.0; 11]);
        cash_flows.push(1100.0);

        let monthly = irr(&cash_flows, 0.01).unwrap();
        let annual = (1.0 + monthly).powi(12) - 1.0;
        assert!((annual - 0.10).abs() < 1e-6, "Expected ~10% IRR, got {}", annual);
    }

    #[test]
    fn test_level_payments() {
        // 10000 lent, twelve payments of 900
        let mut cash_flows = vec![-10_000.0];
        cash_flows.extend(vec![900.0; 12]);

        let rate = irr(&cash_flows, 0.0).unwrap();
        assert!(rate > 0.0);
        assert!(npv(&cash_flows, rate).abs() < 1e-4);
    }

    #[test]
    fn test_npv() {
        assert_relative_eq!(npv(&[-100.0, 110.0], 0.10), 0.0, epsilon = 1e-12);
        assert_relative_eq!(npv(&[-100.0, 50.0, 50.0], 0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(npv(&[0.0, 121.0], 0.10), 110.0, epsilon = 1e-9);
        assert_eq!(npv(&[], 0.05), 0.0);
    }

    #[test]
    fn test_bad_guess_still_converges() {
        let mut cash_flows = vec![-10_000.0];
        cash_flows.extend(vec![900.0; 12]);

        let from_good = irr(&cash_flows, 0.01).unwrap();
        let from_bad = irr(&cash_flows, 9.5).unwrap();
        assert_relative_eq!(from_good, from_bad, epsilon = 1e-6);
    }

    #[test]
    fn test_no_sign_change() {
        assert!(matches!(
            irr(&[100.0, 100.0, 100.0], 0.01),
            Err(SimulationError::NoConvergence { iterations: 0, .. })
        ));
        assert!(matches!(irr(&[], 0.01), Err(SimulationError::NoConvergence { .. })));
    }
}
