//! Simulation requests, results and batch input loading

mod input;
mod result;
pub mod loader;

pub use input::{
    Currency, PropertyInsurance, SimulationInput, DEFAULT_DESGRAVAMEN_RATE,
    DEFAULT_LIFE_INSURANCE_RATE, MAX_GRACE_MONTHS, MAX_TERM_YEARS,
};
pub use result::{Simulation, SimulationStatus};
pub use loader::{load_inputs, load_inputs_from_reader, load_default_inputs};
