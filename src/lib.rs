//! Mortgage Simulator - French amortization engine for Peruvian housing loans
//!
//! This library provides:
//! - Nominal/effective annual rate conversion to an effective monthly rate
//! - Payment schedules with total and partial grace periods
//! - Declining-balance life and desgravamen insurance, flat or rated property insurance
//! - Government bonuses and the NCMV "Premio al Buen Pagador"
//! - NPV, IRR and TCEA indicators
//! - Parallel batch simulation and CSV / JSON lines adapters

pub mod error;
pub mod rates;
pub mod bank;
pub mod simulation;
pub mod schedule;
pub mod indicators;
pub mod simulator;
pub mod pipeline;

// Re-export commonly used types
pub use error::{Result, SimulationError};
pub use bank::{BankConfig, BonusType};
pub use simulation::{Simulation, SimulationInput, SimulationStatus};
pub use schedule::{PaymentSchedule, PeriodType, GracePeriodType, generate_schedule};
pub use indicators::{FinancialIndicators, compute_indicators};
pub use simulator::{Simulator, SimulatorConfig, SimulationOutcome};
