//! Running state while a schedule is generated

use super::PeriodType;

/// Balance and installment carried from one period to the next
#[derive(Debug, Clone)]
pub struct ScheduleState {
    /// Periods already generated (0-based index of the next period)
    pub period_index: u32,

    /// Outstanding balance at the start of the next period
    pub balance: f64,

    /// Constant French installment of the current ordinary segment.
    /// `None` until the first ordinary period of a segment recomputes it.
    pub installment: Option<f64>,

    /// Type of the last generated period
    pub last_period_type: Option<PeriodType>,
}

impl ScheduleState {
    /// Initialize state at disbursement
    pub fn new(amount_to_finance: f64) -> Self {
        Self {
            period_index: 0,
            balance: amount_to_finance,
            installment: None,
            last_period_type: None,
        }
    }

    /// Months left in the term, counting the next period
    pub fn remaining_months(&self, loan_term_months: u32) -> u32 {
        loan_term_months.saturating_sub(self.period_index)
    }

    /// Record a generated period and move to the next one
    pub fn advance(&mut self, period_type: PeriodType, final_balance: f64) {
        // A grace period closes the current segment; the next ordinary
        // period recomputes the installment on the new balance
        if period_type.is_grace() {
            self.installment = None;
        }
        self.balance = final_balance;
        self.last_period_type = Some(period_type);
        self.period_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut state = ScheduleState::new(1000.0);
        assert_eq!(state.remaining_months(12), 12);

        state.installment = Some(90.0);
        state.advance(PeriodType::Ordinary, 920.0);
        assert_eq!(state.period_index, 1);
        assert_eq!(state.balance, 920.0);
        assert_eq!(state.installment, Some(90.0));
        assert_eq!(state.remaining_months(12), 11);
    }

    #[test]
    fn test_grace_resets_installment() {
        let mut state = ScheduleState::new(1000.0);
        state.installment = Some(90.0);
        state.advance(PeriodType::TotalGrace, 1010.0);

        assert_eq!(state.installment, None);
        assert_eq!(state.last_period_type, Some(PeriodType::TotalGrace));
    }
}
