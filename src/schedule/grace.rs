//! Grace period classification

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// Grace arrangement requested for the start of the loan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GracePeriodType {
    #[default]
    None,
    /// No payment at all, interest capitalizes
    Total,
    /// Interest-only payments
    Partial,
}

impl GracePeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GracePeriodType::None => "NONE",
            GracePeriodType::Total => "TOTAL",
            GracePeriodType::Partial => "PARTIAL",
        }
    }
}

impl fmt::Display for GracePeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GracePeriodType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(GracePeriodType::None),
            "TOTAL" => Ok(GracePeriodType::Total),
            "PARTIAL" => Ok(GracePeriodType::Partial),
            _ => Err(ParseEnumError::new("grace period type", s)),
        }
    }
}

/// Classification of a single schedule period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    TotalGrace,
    PartialGrace,
    Ordinary,
}

impl PeriodType {
    pub fn is_grace(&self) -> bool {
        !matches!(self, PeriodType::Ordinary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::TotalGrace => "TOTAL_GRACE",
            PeriodType::PartialGrace => "PARTIAL_GRACE",
            PeriodType::Ordinary => "ORDINARY",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a period (0-based index) against the grace arrangement
pub fn classify(period_index: u32, grace_months: u32, grace_type: GracePeriodType) -> PeriodType {
    if period_index >= grace_months {
        return PeriodType::Ordinary;
    }
    match grace_type {
        GracePeriodType::Total => PeriodType::TotalGrace,
        GracePeriodType::Partial => PeriodType::PartialGrace,
        GracePeriodType::None => PeriodType::Ordinary,
    }
}
