//! Error taxonomy for the simulation engine

use thiserror::Error;

use crate::simulation::SimulationStatus;

/// Errors raised while validating inputs, generating schedules or moving data
/// through the collaborator adapters.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Malformed or out-of-range input
    #[error("invalid {field}: {constraint}")]
    Validation {
        field: &'static str,
        constraint: String,
    },

    /// Rate conversion inputs are inconsistent
    #[error("invalid rate: {0}")]
    InvalidRate(String),

    /// IRR solver exhausted its budget or found no bracketed root
    #[error("IRR did not converge after {iterations} iterations (last NPV {last_npv})")]
    NoConvergence { iterations: u32, last_npv: f64 },

    /// A generated schedule broke one of its own invariants
    #[error("arithmetic invariant violated: {0}")]
    ArithmeticInvariant(String),

    /// Status change not allowed by the simulation lifecycle
    #[error("cannot move simulation from {from} to {to}")]
    InvalidTransition {
        from: SimulationStatus,
        to: SimulationStatus,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    pub(crate) fn validation(field: &'static str, constraint: impl Into<String>) -> Self {
        SimulationError::Validation {
            field,
            constraint: constraint.into(),
        }
    }
}

/// Unknown string value for one of the domain enums
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
