//! Calculated simulation summary and its lifecycle

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Currency, SimulationInput};
use crate::error::{ParseEnumError, Result, SimulationError};

/// Lifecycle state of a simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationStatus {
    /// Preview calculation, not persisted
    #[default]
    Draft,
    Saved,
    Approved,
    Rejected,
}

impl SimulationStatus {
    /// DRAFT -> SAVED -> APPROVED | REJECTED
    pub fn can_transition_to(&self, to: SimulationStatus) -> bool {
        matches!(
            (self, to),
            (SimulationStatus::Draft, SimulationStatus::Saved)
                | (SimulationStatus::Saved, SimulationStatus::Approved)
                | (SimulationStatus::Saved, SimulationStatus::Rejected)
        )
    }

    pub fn transition(self, to: SimulationStatus) -> Result<SimulationStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(SimulationError::InvalidTransition { from: self, to })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationStatus::Draft => "DRAFT",
            SimulationStatus::Saved => "SAVED",
            SimulationStatus::Approved => "APPROVED",
            SimulationStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(SimulationStatus::Draft),
            "SAVED" => Ok(SimulationStatus::Saved),
            "APPROVED" => Ok(SimulationStatus::Approved),
            "REJECTED" => Ok(SimulationStatus::Rejected),
            _ => Err(ParseEnumError::new("simulation status", s)),
        }
    }
}

/// Result of a simulation: the request plus everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    #[serde(flatten)]
    pub input: SimulationInput,

    pub amount_to_finance: f64,

    /// Cap-based government bonus actually granted
    pub resolved_bonus_amount: f64,

    pub pbp_amount: f64,

    /// Effective monthly rate used for the schedule
    pub monthly_rate: f64,

    /// Constant French payment of the first ordinary period
    pub monthly_payment: f64,

    /// Monthly payment plus insurance premiums of the first ordinary period
    pub total_monthly_payment: f64,

    pub total_amount_to_pay: f64,
    pub total_interest: f64,

    /// Opening commission, notary and registration fees
    pub total_additional_costs: f64,

    pub loan_term_months: u32,
    pub total_life_insurance: f64,
    pub total_property_insurance: f64,
    pub total_desgravamen_insurance: f64,

    pub npv: f64,

    /// Monthly IRR; `None` when the solver did not converge and the caller opted out
    pub irr: Option<f64>,

    /// Total effective annual cost, percent
    pub tcea: Option<f64>,

    /// Soles per dollar behind the alternate-currency amounts
    #[serde(default)]
    pub exchange_rate_used: Option<f64>,
    #[serde(default)]
    pub alternate_currency: Option<Currency>,
    #[serde(default)]
    pub alternate_currency_symbol: Option<String>,
    #[serde(default)]
    pub property_price_alternate: Option<f64>,
    #[serde(default)]
    pub monthly_payment_alternate: Option<f64>,

    pub status: SimulationStatus,
}

impl Simulation {
    /// Persisting a preview moves it from DRAFT to SAVED
    pub fn into_saved(self) -> Result<Self> {
        self.with_status(SimulationStatus::Saved)
    }

    pub fn approve(self) -> Result<Self> {
        self.with_status(SimulationStatus::Approved)
    }

    pub fn reject(self) -> Result<Self> {
        self.with_status(SimulationStatus::Rejected)
    }

    fn with_status(self, to: SimulationStatus) -> Result<Self> {
        let status = self.status.transition(to)?;
        Ok(Self { status, ..self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(SimulationStatus::Draft.can_transition_to(SimulationStatus::Saved));
        assert!(SimulationStatus::Saved.can_transition_to(SimulationStatus::Approved));
        assert!(SimulationStatus::Saved.can_transition_to(SimulationStatus::Rejected));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!SimulationStatus::Draft.can_transition_to(SimulationStatus::Approved));
        assert!(!SimulationStatus::Approved.can_transition_to(SimulationStatus::Rejected));
        assert!(!SimulationStatus::Rejected.can_transition_to(SimulationStatus::Saved));
        assert!(!SimulationStatus::Saved.can_transition_to(SimulationStatus::Saved));

        let err = SimulationStatus::Draft.transition(SimulationStatus::Rejected).unwrap_err();
        assert_eq!(err.to_string(), "cannot move simulation from DRAFT to REJECTED");
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("saved".parse::<SimulationStatus>().unwrap(), SimulationStatus::Saved);
        assert!("ARCHIVED".parse::<SimulationStatus>().is_err());
    }
}
