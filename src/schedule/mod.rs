//! Payment schedule generation with grace periods and insurance

mod grace;
mod row;
mod state;
mod engine;

pub use grace::{GracePeriodType, PeriodType, classify};
pub use row::{PaymentSchedule, ScheduleTotals};
pub use state::ScheduleState;
pub use engine::{AmortizationCalculator, ScheduleConfig, french_payment, generate_schedule, verify_schedule};
