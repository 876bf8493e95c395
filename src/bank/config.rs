//! Bank entity configuration: NCMV bands, PBP amounts and bonus caps

use serde::{Deserialize, Serialize};

use super::bonus::BonusType;

/// Per-type maximum for the cap-based government bonuses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusCaps {
    pub acquisition: f64,
    pub construction: f64,
    pub improvement: f64,
}

impl Default for BonusCaps {
    fn default() -> Self {
        Self {
            acquisition: 37_800.0,
            construction: 28_400.0,
            improvement: 18_900.0,
        }
    }
}

impl BonusCaps {
    /// Cap for a cap-based bonus type; `None` for the PBP tiers
    pub fn cap_for(&self, bonus_type: BonusType) -> Option<f64> {
        match bonus_type {
            BonusType::Acquisition => Some(self.acquisition),
            BonusType::Construction => Some(self.construction),
            BonusType::Improvement => Some(self.improvement),
            BonusType::PbpStandard | BonusType::PbpPlus => None,
        }
    }
}

/// Configuration of a lending bank entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankConfig {
    /// Bank entity identifier
    pub id: u32,

    pub name: String,

    /// Reference annual rate offered by the bank, in percent
    pub current_rate: f64,

    /// Maximum share of the property price the bank will finance, in percent
    #[serde(default)]
    pub max_coverage_pct: Option<f64>,

    /// Monthly desgravamen rate used when the request does not carry one
    #[serde(default)]
    pub desgravamen_rate: Option<f64>,

    /// Whether the bank participates in Nuevo Credito MiVivienda
    pub supports_ncmv: bool,

    /// Lower bound of the NCMV property value band
    pub ncmv_min_property_value: f64,

    /// Upper bound of the NCMV property value band
    pub ncmv_max_property_value: f64,

    /// Properties priced below this value qualify for PBP Plus
    pub pbp_threshold_low: f64,

    pub pbp_amount_standard: f64,

    pub pbp_amount_plus: f64,

    #[serde(default)]
    pub bonus_caps: BonusCaps,
}

impl BankConfig {
    /// Default NCMV participant with the published program constants
    pub fn default_ncmv() -> Self {
        Self {
            id: 0,
            name: "Default NCMV".to_string(),
            current_rate: 7.5,
            max_coverage_pct: None,
            desgravamen_rate: Some(0.00049),
            supports_ncmv: true,
            ncmv_min_property_value: 68_800.0,
            ncmv_max_property_value: 362_100.0,
            pbp_threshold_low: 102_900.0,
            pbp_amount_standard: 6_400.0,
            pbp_amount_plus: 17_700.0,
            bonus_caps: BonusCaps::default(),
        }
    }

    /// Whether a property price falls inside the NCMV band
    pub fn in_ncmv_band(&self, property_price: f64) -> bool {
        self.supports_ncmv
            && property_price >= self.ncmv_min_property_value
            && property_price <= self.ncmv_max_property_value
    }
}

impl Default for BankConfig {
    fn default() -> Self {
        Self::default_ncmv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ncmv_band() {
        let bank = BankConfig::default_ncmv();

        assert!(!bank.in_ncmv_band(68_799.99));
        assert!(bank.in_ncmv_band(68_800.0));
        assert!(bank.in_ncmv_band(250_000.0));
        assert!(bank.in_ncmv_band(362_100.0));
        assert!(!bank.in_ncmv_band(362_100.01));
    }

    #[test]
    fn test_non_participant_has_no_band() {
        let bank = BankConfig {
            supports_ncmv: false,
            ..BankConfig::default_ncmv()
        };
        assert!(!bank.in_ncmv_band(250_000.0));
    }

    #[test]
    fn test_bonus_caps() {
        let caps = BonusCaps::default();
        assert_eq!(caps.cap_for(BonusType::Acquisition), Some(37_800.0));
        assert_eq!(caps.cap_for(BonusType::Construction), Some(28_400.0));
        assert_eq!(caps.cap_for(BonusType::Improvement), Some(18_900.0));
        assert_eq!(caps.cap_for(BonusType::PbpPlus), None);
    }
}
