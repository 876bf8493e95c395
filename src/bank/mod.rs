//! Bank entity configuration and housing subsidy resolution

mod config;
mod bonus;
pub mod loader;

pub use config::{BankConfig, BonusCaps};
pub use bonus::{BonusType, SubsidyResolution, resolve_bonus, resolve_subsidies};
pub use loader::{load_banks, load_banks_from_reader, load_default_banks};
