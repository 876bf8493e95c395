//! Load simulation requests from simulations.csv

use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::Reader;

use super::{Currency, PropertyInsurance, SimulationInput, DEFAULT_LIFE_INSURANCE_RATE};
use crate::bank::BonusType;
use crate::error::{ParseEnumError, Result, SimulationError};
use crate::rates::{Capitalization, InterestRateType};
use crate::schedule::GracePeriodType;

/// Default location of the batch request file
pub const DEFAULT_SIMULATIONS_PATH: &str = "data/simulations.csv";

/// Raw CSV row matching simulations.csv columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "ClientId")]
    client_id: u32,
    #[serde(rename = "PropertyId")]
    property_id: u32,
    #[serde(rename = "BankEntityId")]
    bank_entity_id: u32,
    #[serde(rename = "SettingsId")]
    settings_id: u32,
    #[serde(rename = "SimulationName")]
    simulation_name: Option<String>,
    #[serde(rename = "Currency")]
    currency: Option<String>,
    #[serde(rename = "PropertyPrice")]
    property_price: f64,
    #[serde(rename = "DownPayment")]
    down_payment: f64,
    #[serde(rename = "ApplyGovernmentBonus")]
    apply_government_bonus: Option<bool>,
    #[serde(rename = "GovernmentBonusAmount")]
    government_bonus_amount: Option<f64>,
    #[serde(rename = "BonusType")]
    bonus_type: Option<String>,
    #[serde(rename = "AnnualRate")]
    annual_rate: Option<f64>,
    #[serde(rename = "TermYears")]
    term_years: u32,
    #[serde(rename = "LifeInsuranceRate")]
    life_insurance_rate: Option<f64>,
    #[serde(rename = "PropertyInsurance")]
    property_insurance: Option<f64>,
    #[serde(rename = "PropertyInsuranceRate")]
    property_insurance_rate: Option<f64>,
    #[serde(rename = "OpeningCommission")]
    opening_commission: Option<f64>,
    #[serde(rename = "NotaryFees")]
    notary_fees: Option<f64>,
    #[serde(rename = "RegistrationFees")]
    registration_fees: Option<f64>,
    #[serde(rename = "DesgravamenRate")]
    desgravamen_rate: Option<f64>,
    #[serde(rename = "ApplyPBP")]
    apply_pbp: Option<bool>,
    #[serde(rename = "InterestRateType")]
    interest_rate_type: String,
    #[serde(rename = "Capitalization")]
    capitalization: Option<String>,
    #[serde(rename = "GracePeriodType")]
    grace_period_type: Option<String>,
    #[serde(rename = "GraceMonths")]
    grace_months: Option<u32>,
    #[serde(rename = "StartDate")]
    start_date: String,
    #[serde(rename = "DiscountRate")]
    discount_rate: Option<f64>,
    #[serde(rename = "ExchangeRate", default)]
    exchange_rate: Option<f64>,
}

/// Parse an optional enum cell; blank means absent
fn parse_optional<T: FromStr<Err = ParseEnumError>>(
    field: &'static str,
    cell: Option<&str>,
) -> Result<Option<T>> {
    match cell.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: ParseEnumError| SimulationError::validation(field, e.to_string())),
        None => Ok(None),
    }
}

impl CsvRow {
    fn into_input(self) -> Result<SimulationInput> {
        let interest_rate_type: InterestRateType = self
            .interest_rate_type
            .parse()
            .map_err(|e: ParseEnumError| SimulationError::validation("interestRateType", e.to_string()))?;
        let capitalization: Option<Capitalization> =
            parse_optional("capitalization", self.capitalization.as_deref())?;
        let bonus_type: Option<BonusType> = parse_optional("bonusType", self.bonus_type.as_deref())?;
        let grace_period_type: GracePeriodType =
            parse_optional("gracePeriodType", self.grace_period_type.as_deref())?.unwrap_or_default();
        let currency: Currency = parse_optional("currency", self.currency.as_deref())?.unwrap_or_default();

        let property_insurance = match (self.property_insurance, self.property_insurance_rate) {
            (Some(_), Some(_)) => {
                return Err(SimulationError::validation(
                    "propertyInsurance",
                    "give either a flat amount or a rate, not both",
                ))
            }
            (Some(amount), None) => PropertyInsurance::Flat(amount),
            (None, Some(rate)) => PropertyInsurance::Rate(rate),
            (None, None) => PropertyInsurance::None,
        };

        let start_date = NaiveDate::parse_from_str(self.start_date.trim(), "%Y-%m-%d")
            .map_err(|e| SimulationError::validation("startDate", e.to_string()))?;

        Ok(SimulationInput {
            client_id: self.client_id,
            property_id: self.property_id,
            bank_entity_id: self.bank_entity_id,
            settings_id: self.settings_id,
            simulation_name: self.simulation_name.filter(|s| !s.trim().is_empty()),
            currency,
            property_price: self.property_price,
            down_payment: self.down_payment,
            apply_government_bonus: self.apply_government_bonus.unwrap_or(false),
            government_bonus_amount: self.government_bonus_amount.unwrap_or(0.0),
            bonus_type,
            annual_rate: self.annual_rate,
            term_years: self.term_years,
            life_insurance_rate: self.life_insurance_rate.unwrap_or(DEFAULT_LIFE_INSURANCE_RATE),
            property_insurance,
            opening_commission: self.opening_commission.unwrap_or(0.0),
            notary_fees: self.notary_fees.unwrap_or(0.0),
            registration_fees: self.registration_fees.unwrap_or(0.0),
            desgravamen_rate: self.desgravamen_rate,
            apply_pbp: self.apply_pbp.unwrap_or(false),
            interest_rate_type,
            capitalization,
            grace_period_type,
            grace_months: self.grace_months.unwrap_or(0),
            start_date,
            discount_rate: self.discount_rate,
            exchange_rate: self.exchange_rate,
        })
    }
}

/// Load all simulation requests from a CSV file
pub fn load_inputs<P: AsRef<Path>>(path: P) -> Result<Vec<SimulationInput>> {
    let reader = Reader::from_path(path)?;
    collect_inputs(reader)
}

/// Load simulation requests from any reader (e.g., string buffer, network stream)
pub fn load_inputs_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<SimulationInput>> {
    collect_inputs(Reader::from_reader(reader))
}

/// Load simulation requests from the default simulations.csv location
pub fn load_default_inputs() -> Result<Vec<SimulationInput>> {
    load_inputs(DEFAULT_SIMULATIONS_PATH)
}

fn collect_inputs<R: std::io::Read>(mut reader: Reader<R>) -> Result<Vec<SimulationInput>> {
    let mut inputs = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        inputs.push(row.into_input()?);
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ClientId,PropertyId,BankEntityId,SettingsId,SimulationName,Currency,PropertyPrice,DownPayment,ApplyGovernmentBonus,GovernmentBonusAmount,BonusType,AnnualRate,TermYears,LifeInsuranceRate,PropertyInsurance,PropertyInsuranceRate,OpeningCommission,NotaryFees,RegistrationFees,DesgravamenRate,ApplyPBP,InterestRateType,Capitalization,GracePeriodType,GraceMonths,StartDate,DiscountRate,ExchangeRate";

    #[test]
    fn test_load_from_reader() {
        let data = format!(
            "{}\n5,9,2,1,Casa,USD,250000,40000,true,20000,acquisition,8.4,25,,45,,500,350,120,,false,NOMINAL,MONTHLY,TOTAL,3,2025-02-01,10,3.75\n",
            HEADER
        );
        let inputs = load_inputs_from_reader(data.as_bytes()).unwrap();
        assert_eq!(inputs.len(), 1);

        let input = &inputs[0];
        assert_eq!(input.client_id, 5);
        assert_eq!(input.currency, Currency::Usd);
        assert_eq!(input.bonus_type, Some(BonusType::Acquisition));
        assert_eq!(input.capitalization, Some(Capitalization::Monthly));
        assert_eq!(input.grace_period_type, GracePeriodType::Total);
        assert_eq!(input.grace_months, 3);
        assert_eq!(input.property_insurance, PropertyInsurance::Flat(45.0));
        assert_eq!(input.life_insurance_rate, DEFAULT_LIFE_INSURANCE_RATE);
        assert_eq!(input.annual_rate, Some(8.4));
        // Blank desgravamen is resolved against the bank later
        assert_eq!(input.desgravamen_rate, None);
        assert_eq!(input.discount_rate, Some(10.0));
        assert_eq!(input.exchange_rate, Some(3.75));
        assert_eq!(input.start_date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_unknown_enum_is_validation_error() {
        let data = format!(
            "{}\n1,1,1,1,,PEN,100000,10000,false,0,,8,20,,,,,,,,false,SIMPLE,,NONE,0,2025-01-01,,\n",
            HEADER
        );
        assert!(matches!(
            load_inputs_from_reader(data.as_bytes()),
            Err(SimulationError::Validation { field: "interestRateType", .. })
        ));
    }

    #[test]
    fn test_both_property_insurance_columns_rejected() {
        let data = format!(
            "{}\n1,1,1,1,,PEN,100000,10000,false,0,,8,20,,40,0.0003,,,,,false,EFFECTIVE,,NONE,0,2025-01-01,,\n",
            HEADER
        );
        assert!(matches!(
            load_inputs_from_reader(data.as_bytes()),
            Err(SimulationError::Validation { field: "propertyInsurance", .. })
        ));
    }

    #[test]
    fn test_load_default_inputs() {
        let inputs = load_default_inputs().expect("Failed to load simulations");
        assert_eq!(inputs.len(), 4);
        assert!(inputs.iter().all(|i| i.validate().is_ok()));

        assert_eq!(inputs[1].desgravamen_rate, None);
        assert_eq!(inputs[2].annual_rate, None);
        assert_eq!(inputs[3].exchange_rate, Some(3.75));
    }
}
