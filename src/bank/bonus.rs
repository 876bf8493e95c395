//! Government bonus and Premio al Buen Pagador (PBP) resolution

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::BankConfig;
use crate::error::{ParseEnumError, Result, SimulationError};
use crate::simulation::SimulationInput;

/// Housing subsidy programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusType {
    Acquisition,
    Construction,
    Improvement,
    /// Premio al Buen Pagador, standard tier
    PbpStandard,
    /// Premio al Buen Pagador, plus tier (lower priced homes)
    PbpPlus,
}

impl BonusType {
    pub fn is_pbp(&self) -> bool {
        matches!(self, BonusType::PbpStandard | BonusType::PbpPlus)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BonusType::Acquisition => "ACQUISITION",
            BonusType::Construction => "CONSTRUCTION",
            BonusType::Improvement => "IMPROVEMENT",
            BonusType::PbpStandard => "PBP_STANDARD",
            BonusType::PbpPlus => "PBP_PLUS",
        }
    }
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BonusType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACQUISITION" => Ok(BonusType::Acquisition),
            "CONSTRUCTION" => Ok(BonusType::Construction),
            "IMPROVEMENT" => Ok(BonusType::Improvement),
            "PBP_STANDARD" => Ok(BonusType::PbpStandard),
            "PBP_PLUS" => Ok(BonusType::PbpPlus),
            _ => Err(ParseEnumError::new("bonus type", s)),
        }
    }
}

/// Subsidies deducted from the property price before financing
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsidyResolution {
    /// Cap-based government bonus actually granted
    pub government_bonus: f64,
    /// PBP amount actually granted
    pub pbp_amount: f64,
}

impl SubsidyResolution {
    pub fn total(&self) -> f64 {
        self.government_bonus + self.pbp_amount
    }
}

/// Maximum bonus a property qualifies for under `bonus_type` at `bank`.
///
/// PBP tiers pay the bank's fixed amount inside the NCMV band and nothing
/// outside it; PBP Plus falls back to Standard above the Plus threshold.
/// The cap-based types return their per-type cap.
pub fn resolve_bonus(property_price: f64, bonus_type: BonusType, bank: &BankConfig) -> f64 {
    match bonus_type {
        BonusType::PbpStandard | BonusType::PbpPlus => {
            if !bank.in_ncmv_band(property_price) {
                return 0.0;
            }
            if bonus_type == BonusType::PbpPlus && property_price < bank.pbp_threshold_low {
                bank.pbp_amount_plus
            } else {
                bank.pbp_amount_standard
            }
        }
        other => bank.bonus_caps.cap_for(other).unwrap_or(0.0),
    }
}

/// Resolve the government bonus and PBP granted to a request
pub fn resolve_subsidies(input: &SimulationInput, bank: &BankConfig) -> Result<SubsidyResolution> {
    let mut resolution = SubsidyResolution::default();

    if input.apply_government_bonus {
        let bonus_type = input.bonus_type.ok_or_else(|| {
            SimulationError::validation("bonusType", "required when applyGovernmentBonus is set")
        })?;

        if bonus_type.is_pbp() {
            resolution.pbp_amount = resolve_bonus(input.property_price, bonus_type, bank);
        } else {
            let cap = resolve_bonus(input.property_price, bonus_type, bank);
            if input.government_bonus_amount > cap {
                warn!(
                    "{} bonus of {:.2} exceeds cap {:.2}, clamping",
                    bonus_type, input.government_bonus_amount, cap
                );
            }
            resolution.government_bonus = input.government_bonus_amount.min(cap);
        }
    }

    let pbp_bonus_type = input.apply_government_bonus && input.bonus_type.map_or(false, |t| t.is_pbp());

    // PBP requested on its own picks the best tier the property qualifies for
    if input.apply_pbp && !pbp_bonus_type {
        resolution.pbp_amount = resolve_bonus(input.property_price, BonusType::PbpPlus, bank);
    }

    if (input.apply_pbp || pbp_bonus_type) && resolution.pbp_amount == 0.0 {
        warn!(
            "property price {:.2} is outside the NCMV band of bank {}, no PBP granted",
            input.property_price, bank.id
        );
    }

    debug!(
        "subsidies resolved: government bonus {:.2}, PBP {:.2}",
        resolution.government_bonus, resolution.pbp_amount
    );

    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulationInput;

    #[test]
    fn test_pbp_plus_below_threshold() {
        let bank = BankConfig::default_ncmv();
        assert_eq!(resolve_bonus(95_000.0, BonusType::PbpPlus, &bank), 17_700.0);
        assert_eq!(resolve_bonus(102_899.99, BonusType::PbpPlus, &bank), 17_700.0);
        // The threshold itself already pays Standard
        assert_eq!(resolve_bonus(102_900.0, BonusType::PbpPlus, &bank), 6_400.0);
    }

    #[test]
    fn test_pbp_plus_falls_back_to_standard() {
        let bank = BankConfig::default_ncmv();
        assert_eq!(resolve_bonus(150_000.0, BonusType::PbpPlus, &bank), 6_400.0);
        assert_eq!(resolve_bonus(150_000.0, BonusType::PbpStandard, &bank), 6_400.0);
        // Standard never upgrades to Plus
        assert_eq!(resolve_bonus(95_000.0, BonusType::PbpStandard, &bank), 6_400.0);
    }

    #[test]
    fn test_pbp_outside_band() {
        let bank = BankConfig::default_ncmv();
        assert_eq!(resolve_bonus(50_000.0, BonusType::PbpPlus, &bank), 0.0);
        assert_eq!(resolve_bonus(400_000.0, BonusType::PbpStandard, &bank), 0.0);

        let no_ncmv = BankConfig {
            supports_ncmv: false,
            ..BankConfig::default_ncmv()
        };
        assert_eq!(resolve_bonus(150_000.0, BonusType::PbpStandard, &no_ncmv), 0.0);
    }

    #[test]
    fn test_cap_based_types() {
        let bank = BankConfig::default_ncmv();
        assert_eq!(resolve_bonus(150_000.0, BonusType::Acquisition, &bank), 37_800.0);
        assert_eq!(resolve_bonus(150_000.0, BonusType::Construction, &bank), 28_400.0);
        assert_eq!(resolve_bonus(150_000.0, BonusType::Improvement, &bank), 18_900.0);
    }

    #[test]
    fn test_requested_bonus_is_clamped() {
        let bank = BankConfig::default_ncmv();
        let mut input = SimulationInput::sample();
        input.apply_government_bonus = true;
        input.bonus_type = Some(BonusType::Improvement);
        input.government_bonus_amount = 25_000.0;

        let resolution = resolve_subsidies(&input, &bank).unwrap();
        assert_eq!(resolution.government_bonus, 18_900.0);
        assert_eq!(resolution.pbp_amount, 0.0);

        input.government_bonus_amount = 10_000.0;
        let resolution = resolve_subsidies(&input, &bank).unwrap();
        assert_eq!(resolution.government_bonus, 10_000.0);
    }

    #[test]
    fn test_bonus_ignored_when_not_applied() {
        let bank = BankConfig::default_ncmv();
        let mut input = SimulationInput::sample();
        input.apply_government_bonus = false;
        input.bonus_type = Some(BonusType::Acquisition);
        input.government_bonus_amount = 30_000.0;

        let resolution = resolve_subsidies(&input, &bank).unwrap();
        assert_eq!(resolution.total(), 0.0);
    }

    #[test]
    fn test_bonus_type_required() {
        let bank = BankConfig::default_ncmv();
        let mut input = SimulationInput::sample();
        input.apply_government_bonus = true;
        input.bonus_type = None;

        assert!(matches!(
            resolve_subsidies(&input, &bank),
            Err(SimulationError::Validation { field: "bonusType", .. })
        ));
    }

    #[test]
    fn test_apply_pbp_picks_tier() {
        let bank = BankConfig::default_ncmv();
        let mut input = SimulationInput::sample();
        input.apply_pbp = true;

        input.property_price = 100_000.0;
        input.down_payment = 10_000.0;
        assert_eq!(resolve_subsidies(&input, &bank).unwrap().pbp_amount, 17_700.0);

        input.property_price = 300_000.0;
        assert_eq!(resolve_subsidies(&input, &bank).unwrap().pbp_amount, 6_400.0);
    }

    #[test]
    fn test_pbp_bonus_type_not_double_counted() {
        let bank = BankConfig::default_ncmv();
        let mut input = SimulationInput::sample();
        input.property_price = 200_000.0;
        input.apply_government_bonus = true;
        input.bonus_type = Some(BonusType::PbpStandard);
        input.apply_pbp = true;

        let resolution = resolve_subsidies(&input, &bank).unwrap();
        assert_eq!(resolution.pbp_amount, 6_400.0);
        assert_eq!(resolution.government_bonus, 0.0);
        assert_eq!(resolution.total(), 6_400.0);
    }
}
