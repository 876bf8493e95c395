//! Simulation request matching the backend SimulationRequest format

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::bank::{BonusType, SubsidyResolution};
use crate::error::{ParseEnumError, Result, SimulationError};
use crate::rates::{Capitalization, InterestRateType};
use crate::schedule::GracePeriodType;

/// Default monthly life insurance rate on the outstanding balance
pub const DEFAULT_LIFE_INSURANCE_RATE: f64 = 0.0005;

/// Default monthly desgravamen rate on the outstanding balance
pub const DEFAULT_DESGRAVAMEN_RATE: f64 = 0.00049;

/// Longest supported loan, in years
pub const MAX_TERM_YEARS: u32 = 30;

/// Longest supported grace period, in months
pub const MAX_GRACE_MONTHS: u32 = 60;

fn default_life_insurance_rate() -> f64 {
    DEFAULT_LIFE_INSURANCE_RATE
}

fn default_rate_type() -> InterestRateType {
    InterestRateType::Effective
}

/// Loan currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Currency {
    /// Peruvian soles
    #[default]
    Pen,
    /// US dollars
    Usd,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Pen => "S/",
            Currency::Usd => "$",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Pen => "PEN",
            Currency::Usd => "USD",
        }
    }

    /// The other supported currency
    pub fn alternate(&self) -> Currency {
        match self {
            Currency::Pen => Currency::Usd,
            Currency::Usd => Currency::Pen,
        }
    }

    /// Convert an amount in this currency to its alternate, given soles per dollar
    pub fn to_alternate(&self, amount: f64, pen_per_usd: f64) -> f64 {
        match self {
            Currency::Pen => amount / pen_per_usd,
            Currency::Usd => amount * pen_per_usd,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PEN" => Ok(Currency::Pen),
            "USD" => Ok(Currency::Usd),
            _ => Err(ParseEnumError::new("currency", s)),
        }
    }
}

/// How the monthly property insurance premium is quoted
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyInsurance {
    /// No property insurance
    #[default]
    None,
    /// Flat monthly amount
    Flat(f64),
    /// Monthly rate applied to the property price
    Rate(f64),
}

impl PropertyInsurance {
    /// Monthly premium for a property of the given price
    pub fn monthly_premium(&self, property_price: f64) -> f64 {
        match self {
            PropertyInsurance::None => 0.0,
            PropertyInsurance::Flat(amount) => *amount,
            PropertyInsurance::Rate(rate) => rate * property_price,
        }
    }

    fn value(&self) -> f64 {
        match self {
            PropertyInsurance::None => 0.0,
            PropertyInsurance::Flat(v) | PropertyInsurance::Rate(v) => *v,
        }
    }
}

/// A mortgage simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub client_id: u32,
    pub property_id: u32,
    pub bank_entity_id: u32,
    pub settings_id: u32,

    #[serde(default)]
    pub simulation_name: Option<String>,

    #[serde(default)]
    pub currency: Currency,

    /// Price of the property
    pub property_price: f64,

    /// Cash paid up front by the client
    pub down_payment: f64,

    #[serde(default)]
    pub apply_government_bonus: bool,

    /// Requested government bonus, clamped to the per-type cap
    #[serde(default)]
    pub government_bonus_amount: f64,

    #[serde(default)]
    pub bonus_type: Option<BonusType>,

    /// Annual rate in percent (9.0 = 9%); `None` takes the bank's current rate
    #[serde(default)]
    pub annual_rate: Option<f64>,

    /// Loan term in years (1-30)
    pub term_years: u32,

    /// Monthly life insurance rate on the outstanding balance
    #[serde(default = "default_life_insurance_rate")]
    pub life_insurance_rate: f64,

    #[serde(default)]
    pub property_insurance: PropertyInsurance,

    #[serde(default)]
    pub opening_commission: f64,

    #[serde(default)]
    pub notary_fees: f64,

    #[serde(default)]
    pub registration_fees: f64,

    /// Monthly desgravamen rate; `None` takes the bank's rate, or
    /// `DEFAULT_DESGRAVAMEN_RATE` when the bank has none
    #[serde(default)]
    pub desgravamen_rate: Option<f64>,

    #[serde(rename = "applyPBP", default)]
    pub apply_pbp: bool,

    #[serde(default = "default_rate_type")]
    pub interest_rate_type: InterestRateType,

    /// Required iff the rate is nominal
    #[serde(default)]
    pub capitalization: Option<Capitalization>,

    #[serde(default)]
    pub grace_period_type: GracePeriodType,

    #[serde(default)]
    pub grace_months: u32,

    /// Base date; payment n falls n months after it
    pub start_date: NaiveDate,

    /// Effective annual discount rate (percent) for NPV; defaults to the loan rate
    #[serde(default)]
    pub discount_rate: Option<f64>,

    /// Soles per US dollar; when set the result carries alternate-currency amounts
    #[serde(default)]
    pub exchange_rate: Option<f64>,
}

impl SimulationInput {
    /// Loan term in months
    pub fn loan_term_months(&self) -> u32 {
        self.term_years * 12
    }

    /// Fees paid at disbursement
    pub fn upfront_costs(&self) -> f64 {
        self.opening_commission + self.notary_fees + self.registration_fees
    }

    /// Amount to finance once down payment and subsidies are deducted
    pub fn amount_to_finance(&self, subsidies: &SubsidyResolution) -> f64 {
        self.property_price - self.down_payment - subsidies.total()
    }

    /// Check field ranges. Rate consistency is checked by the rate converter.
    pub fn validate(&self) -> Result<()> {
        if !self.property_price.is_finite() || self.property_price <= 0.0 {
            return Err(SimulationError::validation("propertyPrice", "must be greater than 0"));
        }
        if !self.down_payment.is_finite() || self.down_payment < 0.0 {
            return Err(SimulationError::validation("downPayment", "must be 0 or greater"));
        }
        if self.down_payment >= self.property_price {
            return Err(SimulationError::validation(
                "downPayment",
                format!(
                    "{:.2} must be less than the property price {:.2}",
                    self.down_payment, self.property_price
                ),
            ));
        }
        if !self.government_bonus_amount.is_finite() || self.government_bonus_amount < 0.0 {
            return Err(SimulationError::validation("governmentBonusAmount", "must be 0 or greater"));
        }
        if self.term_years < 1 || self.term_years > MAX_TERM_YEARS {
            return Err(SimulationError::validation(
                "termYears",
                format!("{} must be between 1 and {}", self.term_years, MAX_TERM_YEARS),
            ));
        }
        if self.grace_months > MAX_GRACE_MONTHS {
            return Err(SimulationError::validation(
                "graceMonths",
                format!("{} must be between 0 and {}", self.grace_months, MAX_GRACE_MONTHS),
            ));
        }
        if self.grace_period_type != GracePeriodType::None && self.grace_months >= self.loan_term_months() {
            return Err(SimulationError::validation(
                "graceMonths",
                format!("{} must be shorter than the {}-month term", self.grace_months, self.loan_term_months()),
            ));
        }

        check_non_negative("lifeInsuranceRate", self.life_insurance_rate)?;
        check_non_negative("propertyInsurance", self.property_insurance.value())?;
        check_non_negative("openingCommission", self.opening_commission)?;
        check_non_negative("notaryFees", self.notary_fees)?;
        check_non_negative("registrationFees", self.registration_fees)?;
        if let Some(rate) = self.desgravamen_rate {
            check_non_negative("desgravamenRate", rate)?;
        }

        if let Some(rate) = self.discount_rate {
            if !rate.is_finite() || rate <= -100.0 {
                return Err(SimulationError::validation("discountRate", "must be greater than -100%"));
            }
        }

        if let Some(rate) = self.exchange_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(SimulationError::validation("exchangeRate", "must be greater than 0"));
            }
        }

        Ok(())
    }

    /// 300,000 property, 20% down, 9% effective over 20 years
    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        Self {
            client_id: 1,
            property_id: 1,
            bank_entity_id: 1,
            settings_id: 1,
            simulation_name: None,
            currency: Currency::Pen,
            property_price: 300_000.0,
            down_payment: 60_000.0,
            apply_government_bonus: false,
            government_bonus_amount: 0.0,
            bonus_type: None,
            annual_rate: Some(9.0),
            term_years: 20,
            life_insurance_rate: DEFAULT_LIFE_INSURANCE_RATE,
            property_insurance: PropertyInsurance::None,
            opening_commission: 0.0,
            notary_fees: 0.0,
            registration_fees: 0.0,
            desgravamen_rate: Some(DEFAULT_DESGRAVAMEN_RATE),
            apply_pbp: false,
            interest_rate_type: InterestRateType::Effective,
            capitalization: None,
            grace_period_type: GracePeriodType::None,
            grace_months: 0,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            discount_rate: None,
            exchange_rate: None,
        }
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::validation(field, "must be 0 or greater"));
    }
    Ok(())
}
