//! Run every simulation in simulations.csv against bank_entities.csv
//!
//! Writes all payment schedules to a single CSV and prints one summary line per simulation

use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

use anyhow::Context;

use mortgage_simulator::bank::loader::DEFAULT_BANKS_PATH;
use mortgage_simulator::pipeline::{run_pipeline, CsvInputProvider, CsvScheduleSink, SimulationSink};
use mortgage_simulator::simulation::loader::DEFAULT_SIMULATIONS_PATH;
use mortgage_simulator::{PaymentSchedule, Simulation, Simulator};

/// Prints a summary line, then forwards to the schedule writer
struct SummarySink<S> {
    inner: S,
}

impl<S: SimulationSink> SimulationSink for SummarySink<S> {
    fn accept(&mut self, simulation: &Simulation, schedule: &[PaymentSchedule]) -> mortgage_simulator::Result<()> {
        let symbol = simulation.input.currency.symbol();
        println!(
            "{:>6} {:>6} {:<28} {:>3} {:>14.2} {:>10.2} {:>10}",
            simulation.input.client_id,
            simulation.input.bank_entity_id,
            simulation.input.simulation_name.as_deref().unwrap_or("-"),
            symbol,
            simulation.amount_to_finance,
            simulation.monthly_payment,
            simulation.tcea.map_or_else(|| "n/a".to_string(), |t| format!("{:.4}%", t)),
        );
        self.inner.accept(simulation, schedule)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let inputs_path = args.next().unwrap_or_else(|| DEFAULT_SIMULATIONS_PATH.to_string());
    let output_path = args.next().unwrap_or_else(|| "batch_schedules.csv".to_string());

    let start = Instant::now();
    println!("Loading banks from {}...", DEFAULT_BANKS_PATH);
    let simulator = Simulator::from_csv(DEFAULT_BANKS_PATH).context("failed to load bank entities")?;

    let file = File::create(&output_path).with_context(|| format!("failed to create {}", output_path))?;
    let mut sink = SummarySink {
        inner: CsvScheduleSink::new(BufWriter::new(file)),
    };
    let mut provider = CsvInputProvider::new(&inputs_path);

    println!("Running simulations from {}...\n", inputs_path);
    println!(
        "{:>6} {:>6} {:<28} {:>3} {:>14} {:>10} {:>10}",
        "Client", "Bank", "Name", "", "Financed", "Payment", "TCEA"
    );
    println!("{}", "-".repeat(85));

    let report = run_pipeline(&simulator, &mut provider, &mut sink).context("batch run failed")?;
    sink.inner.into_inner()?;

    for (index, error) in &report.failures {
        println!("  row {}: {}", index + 1, error);
    }

    println!("\nBatch Summary:");
    println!("  Simulations:     {}", report.total);
    println!("  Succeeded:       {}", report.succeeded);
    println!("  Failed:          {}", report.failed());
    println!("\nSchedules written to {}", output_path);
    println!("Total time: {:?}", start.elapsed());

    Ok(())
}
