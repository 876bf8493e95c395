//! Payment schedule rows and totals

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PeriodType;

/// One month of the payment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSchedule {
    /// 1-based, sequential
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub initial_balance: f64,
    /// Loan installment: principal plus interest actually paid
    pub payment: f64,
    pub principal: f64,
    /// Interest accrued on the initial balance
    pub interest: f64,
    pub final_balance: f64,
    pub life_insurance: f64,
    pub property_insurance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desgravamen_insurance: Option<f64>,
    /// Installment plus insurance premiums
    pub total_payment: f64,
    pub period_type: PeriodType,
}

impl PaymentSchedule {
    /// Sum of insurance premiums for the period
    pub fn insurance(&self) -> f64 {
        self.life_insurance + self.property_insurance + self.desgravamen_insurance.unwrap_or(0.0)
    }
}

/// Column totals over a schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTotals {
    pub total_payments: f64,
    pub total_principal: f64,
    pub total_interest: f64,
    pub total_life_insurance: f64,
    pub total_property_insurance: f64,
    pub total_desgravamen_insurance: f64,
    pub grand_total: f64,
}

impl ScheduleTotals {
    pub fn from_schedule(schedule: &[PaymentSchedule]) -> Self {
        schedule.iter().fold(Self::default(), |mut totals, row| {
            totals.total_payments += row.payment;
            totals.total_principal += row.principal;
            totals.total_interest += row.interest;
            totals.total_life_insurance += row.life_insurance;
            totals.total_property_insurance += row.property_insurance;
            totals.total_desgravamen_insurance += row.desgravamen_insurance.unwrap_or(0.0);
            totals.grand_total += row.total_payment;
            totals
        })
    }
}
