//! Interest rate conversion
//!
//! Normalizes nominal and effective annual rates into the effective monthly
//! rate used by the schedule engine. Annual rates are given in percent
//! (9.0 means 9%), converted rates are returned as decimals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseEnumError, Result, SimulationError};

/// Upper bound for an annual rate, in percent
pub const MAX_ANNUAL_RATE_PCT: f64 = 100.0;

/// Whether the quoted annual rate is nominal or effective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestRateType {
    /// Nominal rate, compounded at a [`Capitalization`] frequency
    Nominal,
    /// Effective annual rate
    Effective,
}

impl InterestRateType {
    pub fn requires_capitalization(&self) -> bool {
        matches!(self, InterestRateType::Nominal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterestRateType::Nominal => "NOMINAL",
            InterestRateType::Effective => "EFFECTIVE",
        }
    }
}

impl fmt::Display for InterestRateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterestRateType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOMINAL" => Ok(InterestRateType::Nominal),
            "EFFECTIVE" => Ok(InterestRateType::Effective),
            _ => Err(ParseEnumError::new("interest rate type", s)),
        }
    }
}

/// Compounding frequency of a nominal rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capitalization {
    Daily,
    Fortnightly,
    Monthly,
    /// Every two months
    Bimonthly,
    /// Every three months
    Trimesterly,
    /// Every four months (cuatrimestral)
    Quarterly,
    Semiannual,
    Yearly,
}

impl Capitalization {
    /// Compounding periods per year. Daily uses the 360-day commercial year.
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Capitalization::Daily => 360,
            Capitalization::Fortnightly => 24,
            Capitalization::Monthly => 12,
            Capitalization::Bimonthly => 6,
            Capitalization::Trimesterly => 4,
            Capitalization::Quarterly => 3,
            Capitalization::Semiannual => 2,
            Capitalization::Yearly => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capitalization::Daily => "DAILY",
            Capitalization::Fortnightly => "FORTNIGHTLY",
            Capitalization::Monthly => "MONTHLY",
            Capitalization::Bimonthly => "BIMONTHLY",
            Capitalization::Trimesterly => "TRIMESTERLY",
            Capitalization::Quarterly => "QUARTERLY",
            Capitalization::Semiannual => "SEMIANNUAL",
            Capitalization::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Capitalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capitalization {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Capitalization::Daily),
            "FORTNIGHTLY" => Ok(Capitalization::Fortnightly),
            "MONTHLY" => Ok(Capitalization::Monthly),
            "BIMONTHLY" => Ok(Capitalization::Bimonthly),
            "TRIMESTERLY" => Ok(Capitalization::Trimesterly),
            "QUARTERLY" => Ok(Capitalization::Quarterly),
            "SEMIANNUAL" => Ok(Capitalization::Semiannual),
            "YEARLY" => Ok(Capitalization::Yearly),
            _ => Err(ParseEnumError::new("capitalization", s)),
        }
    }
}

/// Convert a quoted annual rate (percent) into an effective annual rate (decimal).
///
/// Nominal rates are compounded as `(1 + r/k)^k - 1` with `k` periods per year.
pub fn effective_annual_rate(
    annual_rate_pct: f64,
    rate_type: InterestRateType,
    capitalization: Option<Capitalization>,
) -> Result<f64> {
    if !annual_rate_pct.is_finite() || annual_rate_pct <= 0.0 || annual_rate_pct > MAX_ANNUAL_RATE_PCT {
        return Err(SimulationError::InvalidRate(format!(
            "annual rate {} must be in (0, {}]",
            annual_rate_pct, MAX_ANNUAL_RATE_PCT
        )));
    }

    let rate = annual_rate_pct / 100.0;

    match (rate_type, capitalization) {
        (InterestRateType::Effective, None) => Ok(rate),
        (InterestRateType::Effective, Some(cap)) => Err(SimulationError::InvalidRate(format!(
            "effective rate must not carry a capitalization (got {})",
            cap
        ))),
        (InterestRateType::Nominal, Some(cap)) => {
            let k = cap.periods_per_year() as f64;
            Ok((1.0 + rate / k).powf(k) - 1.0)
        }
        (InterestRateType::Nominal, None) => Err(SimulationError::InvalidRate(
            "nominal rate requires a capitalization".to_string(),
        )),
    }
}

/// Effective annual rate (decimal) to effective monthly rate (decimal)
pub fn effective_annual_to_monthly(effective_annual: f64) -> f64 {
    (1.0 + effective_annual).powf(1.0 / 12.0) - 1.0
}

/// Effective monthly rate (decimal) to effective annual rate (decimal)
pub fn monthly_to_effective_annual(monthly: f64) -> f64 {
    (1.0 + monthly).powi(12) - 1.0
}

/// Convert a quoted annual rate (percent) into the effective monthly rate (decimal)
pub fn to_effective_monthly_rate(
    annual_rate_pct: f64,
    rate_type: InterestRateType,
    capitalization: Option<Capitalization>,
) -> Result<f64> {
    let tea = effective_annual_rate(annual_rate_pct, rate_type, capitalization)?;
    Ok(effective_annual_to_monthly(tea))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_effective_to_monthly() {
        let monthly = to_effective_monthly_rate(9.0, InterestRateType::Effective, None).unwrap();
        assert_relative_eq!(monthly, 0.0072073233, epsilon = 1e-9);

        // Twelve compounded months give back the annual rate
        assert_relative_eq!(monthly_to_effective_annual(monthly), 0.09, epsilon = 1e-12);
    }

    #[test]
    fn test_nominal_monthly_capitalization() {
        let tea = effective_annual_rate(8.4, InterestRateType::Nominal, Some(Capitalization::Monthly)).unwrap();
        assert_relative_eq!(tea, (1.0 + 0.084 / 12.0_f64).powi(12) - 1.0, epsilon = 1e-12);
        assert!((tea - 0.0873).abs() < 1e-3);

        // Nominal with monthly capitalization is exactly r/12 per month
        let monthly = to_effective_monthly_rate(8.4, InterestRateType::Nominal, Some(Capitalization::Monthly)).unwrap();
        assert_relative_eq!(monthly, 0.007, epsilon = 1e-12);
    }

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Capitalization::Daily.periods_per_year(), 360);
        assert_eq!(Capitalization::Fortnightly.periods_per_year(), 24);
        assert_eq!(Capitalization::Bimonthly.periods_per_year(), 6);
        assert_eq!(Capitalization::Trimesterly.periods_per_year(), 4);
        assert_eq!(Capitalization::Quarterly.periods_per_year(), 3);
        assert_eq!(Capitalization::Yearly.periods_per_year(), 1);
    }

    #[test]
    fn test_more_frequent_capitalization_costs_more() {
        let yearly = effective_annual_rate(12.0, InterestRateType::Nominal, Some(Capitalization::Yearly)).unwrap();
        let semi = effective_annual_rate(12.0, InterestRateType::Nominal, Some(Capitalization::Semiannual)).unwrap();
        let daily = effective_annual_rate(12.0, InterestRateType::Nominal, Some(Capitalization::Daily)).unwrap();

        assert_relative_eq!(yearly, 0.12, epsilon = 1e-12);
        assert_relative_eq!(semi, 0.1236, epsilon = 1e-12);
        assert!(daily > semi);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(matches!(
            to_effective_monthly_rate(0.0, InterestRateType::Effective, None),
            Err(SimulationError::InvalidRate(_))
        ));
        assert!(matches!(
            to_effective_monthly_rate(-1.0, InterestRateType::Effective, None),
            Err(SimulationError::InvalidRate(_))
        ));
        assert!(matches!(
            to_effective_monthly_rate(100.5, InterestRateType::Effective, None),
            Err(SimulationError::InvalidRate(_))
        ));
        assert!(matches!(
            to_effective_monthly_rate(f64::NAN, InterestRateType::Effective, None),
            Err(SimulationError::InvalidRate(_))
        ));
        assert!(to_effective_monthly_rate(100.0, InterestRateType::Effective, None).is_ok());
    }

    #[test]
    fn test_capitalization_must_match_rate_type() {
        assert!(matches!(
            to_effective_monthly_rate(8.4, InterestRateType::Nominal, None),
            Err(SimulationError::InvalidRate(_))
        ));
        assert!(matches!(
            to_effective_monthly_rate(8.4, InterestRateType::Effective, Some(Capitalization::Monthly)),
            Err(SimulationError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("nominal".parse::<InterestRateType>().unwrap(), InterestRateType::Nominal);
        assert_eq!(" QUARTERLY ".parse::<Capitalization>().unwrap(), Capitalization::Quarterly);
        assert!("weekly".parse::<Capitalization>().is_err());
    }
}
