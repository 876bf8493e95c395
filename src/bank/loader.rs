//! Load bank entity configuration from bank_entities.csv

use std::collections::HashMap;
use std::path::Path;

use csv::Reader;
use log::debug;

use super::{BankConfig, BonusCaps};
use crate::error::{Result, SimulationError};

/// Default location of the bank entity table
pub const DEFAULT_BANKS_PATH: &str = "data/bank_entities.csv";

/// Raw CSV row matching bank_entities.csv columns. Blank cells fall back to
/// the NCMV program defaults.
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Id")]
    id: u32,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "CurrentRate")]
    current_rate: f64,
    #[serde(rename = "MaxCoveragePct")]
    max_coverage_pct: Option<f64>,
    #[serde(rename = "DesgravamenRate")]
    desgravamen_rate: Option<f64>,
    #[serde(rename = "SupportsNCMV")]
    supports_ncmv: Option<bool>,
    #[serde(rename = "NcmvMinPropertyValue")]
    ncmv_min_property_value: Option<f64>,
    #[serde(rename = "NcmvMaxPropertyValue")]
    ncmv_max_property_value: Option<f64>,
    #[serde(rename = "PbpThresholdLow")]
    pbp_threshold_low: Option<f64>,
    #[serde(rename = "PbpAmountStandard")]
    pbp_amount_standard: Option<f64>,
    #[serde(rename = "PbpAmountPlus")]
    pbp_amount_plus: Option<f64>,
    #[serde(rename = "AcquisitionCap")]
    acquisition_cap: Option<f64>,
    #[serde(rename = "ConstructionCap")]
    construction_cap: Option<f64>,
    #[serde(rename = "ImprovementCap")]
    improvement_cap: Option<f64>,
}

impl CsvRow {
    fn into_config(self) -> Result<BankConfig> {
        let defaults = BankConfig::default_ncmv();
        let caps = BonusCaps::default();

        let config = BankConfig {
            id: self.id,
            name: self.name,
            current_rate: self.current_rate,
            max_coverage_pct: self.max_coverage_pct,
            desgravamen_rate: self.desgravamen_rate.or(defaults.desgravamen_rate),
            supports_ncmv: self.supports_ncmv.unwrap_or(defaults.supports_ncmv),
            ncmv_min_property_value: self.ncmv_min_property_value.unwrap_or(defaults.ncmv_min_property_value),
            ncmv_max_property_value: self.ncmv_max_property_value.unwrap_or(defaults.ncmv_max_property_value),
            pbp_threshold_low: self.pbp_threshold_low.unwrap_or(defaults.pbp_threshold_low),
            pbp_amount_standard: self.pbp_amount_standard.unwrap_or(defaults.pbp_amount_standard),
            pbp_amount_plus: self.pbp_amount_plus.unwrap_or(defaults.pbp_amount_plus),
            bonus_caps: BonusCaps {
                acquisition: self.acquisition_cap.unwrap_or(caps.acquisition),
                construction: self.construction_cap.unwrap_or(caps.construction),
                improvement: self.improvement_cap.unwrap_or(caps.improvement),
            },
        };

        if config.ncmv_min_property_value > config.ncmv_max_property_value {
            return Err(SimulationError::validation(
                "ncmvMinPropertyValue",
                format!("bank {} has an empty NCMV band", config.id),
            ));
        }
        if let Some(pct) = config.max_coverage_pct {
            if !(0.0..=100.0).contains(&pct) {
                return Err(SimulationError::validation(
                    "maxCoveragePct",
                    format!("bank {} coverage {} must be within 0-100", config.id, pct),
                ));
            }
        }

        Ok(config)
    }
}

/// Load all bank entities from a CSV file, keyed by id
pub fn load_banks<P: AsRef<Path>>(path: P) -> Result<HashMap<u32, BankConfig>> {
    let reader = Reader::from_path(path)?;
    collect_banks(reader)
}

/// Load bank entities from any reader (e.g., string buffer, network stream)
pub fn load_banks_from_reader<R: std::io::Read>(reader: R) -> Result<HashMap<u32, BankConfig>> {
    collect_banks(Reader::from_reader(reader))
}

/// Load bank entities from the default bank_entities.csv location
pub fn load_default_banks() -> Result<HashMap<u32, BankConfig>> {
    load_banks(DEFAULT_BANKS_PATH)
}

fn collect_banks<R: std::io::Read>(mut reader: Reader<R>) -> Result<HashMap<u32, BankConfig>> {
    let mut banks = HashMap::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let config = row.into_config()?;
        banks.insert(config.id, config);
    }

    debug!("loaded {} bank entities", banks.len());
    Ok(banks)
}
