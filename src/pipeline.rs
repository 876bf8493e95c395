//! Collaborator seams: where requests come from and where results go
//!
//! The engine itself never touches storage. A provider hands over a batch of
//! requests, the simulator calculates them, and every successful simulation is
//! passed to a sink together with its schedule.

use std::io::Write;
use std::path::PathBuf;

use log::{info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::schedule::PaymentSchedule;
use crate::simulation::{load_inputs, Simulation, SimulationInput};
use crate::simulator::{SimulationOutcome, Simulator};

/// Source of simulation requests
pub trait SimulationInputProvider {
    fn provide(&mut self) -> Result<Vec<SimulationInput>>;
}

/// Destination for calculated simulations
pub trait SimulationSink {
    fn accept(&mut self, simulation: &Simulation, schedule: &[PaymentSchedule]) -> Result<()>;
}

/// Counts from a pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub total: usize,
    pub succeeded: usize,
    /// Position in the provided batch and the error message
    pub failures: Vec<(usize, String)>,
}

impl PipelineReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Pull a batch from `provider`, calculate it and hand the results to `sink`.
///
/// Failed simulations are logged and counted; provider and sink errors abort
/// the run.
pub fn run_pipeline<P, S>(simulator: &Simulator, provider: &mut P, sink: &mut S) -> Result<PipelineReport>
where
    P: SimulationInputProvider + ?Sized,
    S: SimulationSink + ?Sized,
{
    let inputs = provider.provide()?;
    let mut report = PipelineReport {
        total: inputs.len(),
        ..Default::default()
    };

    for (index, result) in simulator.run_batch(&inputs).into_iter().enumerate() {
        match result {
            Ok(outcome) => {
                sink.accept(&outcome.simulation, &outcome.schedule)?;
                report.succeeded += 1;
            }
            Err(e) => {
                warn!("simulation {} (client {}) failed: {}", index + 1, inputs[index].client_id, e);
                report.failures.push((index, e.to_string()));
            }
        }
    }

    info!(
        "pipeline finished: {} of {} simulations delivered",
        report.succeeded, report.total
    );

    Ok(report)
}

/// Reads requests from a simulations CSV file
#[derive(Debug, Clone)]
pub struct CsvInputProvider {
    path: PathBuf,
}

impl CsvInputProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SimulationInputProvider for CsvInputProvider {
    fn provide(&mut self) -> Result<Vec<SimulationInput>> {
        load_inputs(&self.path)
    }
}

impl SimulationInputProvider for Vec<SimulationInput> {
    fn provide(&mut self) -> Result<Vec<SimulationInput>> {
        Ok(std::mem::take(self))
    }
}

/// Keeps every accepted simulation in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub outcomes: Vec<SimulationOutcome>,
}

impl SimulationSink for MemorySink {
    fn accept(&mut self, simulation: &Simulation, schedule: &[PaymentSchedule]) -> Result<()> {
        self.outcomes.push(SimulationOutcome {
            simulation: simulation.clone(),
            schedule: schedule.to_vec(),
        });
        Ok(())
    }
}

/// One schedule row tagged with the simulation it belongs to
#[derive(Debug, Serialize)]
struct ScheduleCsvRow<'a> {
    #[serde(rename = "Simulation")]
    simulation: u32,
    #[serde(rename = "ClientId")]
    client_id: u32,
    #[serde(rename = "PropertyId")]
    property_id: u32,
    #[serde(rename = "BankEntityId")]
    bank_entity_id: u32,
    #[serde(rename = "PaymentNumber")]
    payment_number: u32,
    #[serde(rename = "PaymentDate")]
    payment_date: String,
    #[serde(rename = "PeriodType")]
    period_type: &'a str,
    #[serde(rename = "InitialBalance")]
    initial_balance: f64,
    #[serde(rename = "Payment")]
    payment: f64,
    #[serde(rename = "Principal")]
    principal: f64,
    #[serde(rename = "Interest")]
    interest: f64,
    #[serde(rename = "FinalBalance")]
    final_balance: f64,
    #[serde(rename = "LifeInsurance")]
    life_insurance: f64,
    #[serde(rename = "PropertyInsurance")]
    property_insurance: f64,
    #[serde(rename = "DesgravamenInsurance")]
    desgravamen_insurance: Option<f64>,
    #[serde(rename = "TotalPayment")]
    total_payment: f64,
}

/// Writes every schedule row as CSV, one block per simulation
pub struct CsvScheduleSink<W: Write> {
    writer: csv::Writer<W>,
    written: u32,
}

impl<W: Write> CsvScheduleSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            written: 0,
        }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

impl<W: Write> SimulationSink for CsvScheduleSink<W> {
    fn accept(&mut self, simulation: &Simulation, schedule: &[PaymentSchedule]) -> Result<()> {
        self.written += 1;
        for row in schedule {
            self.writer.serialize(ScheduleCsvRow {
                simulation: self.written,
                client_id: simulation.input.client_id,
                property_id: simulation.input.property_id,
                bank_entity_id: simulation.input.bank_entity_id,
                payment_number: row.payment_number,
                payment_date: row.payment_date.format("%Y-%m-%d").to_string(),
                period_type: row.period_type.as_str(),
                initial_balance: row.initial_balance,
                payment: row.payment,
                principal: row.principal,
                interest: row.interest,
                final_balance: row.final_balance,
                life_insurance: row.life_insurance,
                property_insurance: row.property_insurance,
                desgravamen_insurance: row.desgravamen_insurance,
                total_payment: row.total_payment,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonLine<'a> {
    simulation: &'a Simulation,
    schedule: &'a [PaymentSchedule],
}

/// Writes one JSON document per simulation and line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SimulationSink for JsonLinesSink<W> {
    fn accept(&mut self, simulation: &Simulation, schedule: &[PaymentSchedule]) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &JsonLine { simulation, schedule })?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}
