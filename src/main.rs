//! Mortgage Simulator CLI
//!
//! Calculates a single simulation preview and prints its payment schedule

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;

use mortgage_simulator::bank::{load_banks, BonusType};
use mortgage_simulator::pipeline::{CsvScheduleSink, JsonLinesSink, SimulationSink};
use mortgage_simulator::rates::{Capitalization, InterestRateType};
use mortgage_simulator::schedule::{GracePeriodType, ScheduleConfig};
use mortgage_simulator::simulation::{
    Currency, PropertyInsurance, SimulationInput, DEFAULT_LIFE_INSURANCE_RATE,
};
use mortgage_simulator::{Simulator, SimulatorConfig};

/// Preview a French-method mortgage simulation
#[derive(Parser, Debug)]
#[command(name = "mortgage_simulator", version, about)]
struct Cli {
    /// Property price
    #[arg(long)]
    price: f64,

    /// Down payment
    #[arg(long)]
    down_payment: f64,

    /// Annual rate in percent; defaults to the bank's current rate
    #[arg(long)]
    rate: Option<f64>,

    /// NOMINAL or EFFECTIVE
    #[arg(long, default_value = "EFFECTIVE")]
    rate_type: InterestRateType,

    /// Capitalization for nominal rates (e.g. MONTHLY)
    #[arg(long)]
    capitalization: Option<Capitalization>,

    /// Loan term in years
    #[arg(long, default_value_t = 20)]
    years: u32,

    /// NONE, TOTAL or PARTIAL
    #[arg(long, default_value = "NONE")]
    grace_type: GracePeriodType,

    #[arg(long, default_value_t = 0)]
    grace_months: u32,

    /// Payment n falls n months after this date
    #[arg(long)]
    start_date: NaiveDate,

    #[arg(long, default_value = "PEN")]
    currency: Currency,

    /// Soles per US dollar, to also show amounts in the other currency
    #[arg(long)]
    exchange_rate: Option<f64>,

    /// Bank entity id, looked up in --banks
    #[arg(long, default_value_t = 0)]
    bank_id: u32,

    /// Bank entities CSV; without it the default NCMV bank is used
    #[arg(long)]
    banks: Option<PathBuf>,

    /// Government bonus type (ACQUISITION, CONSTRUCTION, IMPROVEMENT, PBP_STANDARD, PBP_PLUS)
    #[arg(long)]
    bonus_type: Option<BonusType>,

    /// Requested government bonus amount
    #[arg(long, default_value_t = 0.0)]
    bonus_amount: f64,

    /// Apply the Premio al Buen Pagador
    #[arg(long)]
    pbp: bool,

    #[arg(long, default_value_t = DEFAULT_LIFE_INSURANCE_RATE)]
    life_rate: f64,

    /// Monthly desgravamen rate; defaults to the bank's rate
    #[arg(long)]
    desgravamen_rate: Option<f64>,

    /// Flat monthly property insurance
    #[arg(long, conflicts_with = "property_insurance_rate")]
    property_insurance: Option<f64>,

    /// Monthly property insurance rate on the property price
    #[arg(long)]
    property_insurance_rate: Option<f64>,

    #[arg(long, default_value_t = 0.0)]
    opening_commission: f64,

    #[arg(long, default_value_t = 0.0)]
    notary_fees: f64,

    #[arg(long, default_value_t = 0.0)]
    registration_fees: f64,

    /// Effective annual discount rate in percent for NPV
    #[arg(long)]
    discount_rate: Option<f64>,

    /// Round every amount to cents
    #[arg(long)]
    round: bool,

    /// Write the full schedule as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the simulation and schedule as a JSON line
    #[arg(long)]
    json: Option<PathBuf>,
}

impl Cli {
    fn to_input(&self) -> SimulationInput {
        let property_insurance = match (self.property_insurance, self.property_insurance_rate) {
            (Some(amount), _) => PropertyInsurance::Flat(amount),
            (None, Some(rate)) => PropertyInsurance::Rate(rate),
            (None, None) => PropertyInsurance::None,
        };

        SimulationInput {
            client_id: 0,
            property_id: 0,
            bank_entity_id: self.bank_id,
            settings_id: 0,
            simulation_name: None,
            currency: self.currency,
            property_price: self.price,
            down_payment: self.down_payment,
            apply_government_bonus: self.bonus_type.is_some(),
            government_bonus_amount: self.bonus_amount,
            bonus_type: self.bonus_type,
            annual_rate: self.rate,
            term_years: self.years,
            life_insurance_rate: self.life_rate,
            property_insurance,
            opening_commission: self.opening_commission,
            notary_fees: self.notary_fees,
            registration_fees: self.registration_fees,
            desgravamen_rate: self.desgravamen_rate,
            apply_pbp: self.pbp,
            interest_rate_type: self.rate_type,
            capitalization: self.capitalization,
            grace_period_type: self.grace_type,
            grace_months: self.grace_months,
            start_date: self.start_date,
            discount_rate: self.discount_rate,
            exchange_rate: self.exchange_rate,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Mortgage Simulator v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    let simulator = match &cli.banks {
        Some(path) => Simulator::with_banks(
            load_banks(path).with_context(|| format!("loading banks from {}", path.display()))?,
        ),
        None => Simulator::new(),
    }
    .with_config(SimulatorConfig {
        schedule: ScheduleConfig {
            round_to_cents: cli.round,
            ..Default::default()
        },
        ..Default::default()
    });

    let input = cli.to_input();
    let outcome = simulator.calculate(&input).context("simulation failed")?;
    let sim = &outcome.simulation;
    let symbol = sim.input.currency.symbol();

    println!("Bank: {}", simulator.bank(input.bank_entity_id).name);
    println!("  Property Price:     {} {:.2}", symbol, sim.input.property_price);
    println!("  Down Payment:       {} {:.2}", symbol, sim.input.down_payment);
    println!("  Government Bonus:   {} {:.2}", symbol, sim.resolved_bonus_amount);
    println!("  PBP:                {} {:.2}", symbol, sim.pbp_amount);
    println!("  Amount to Finance:  {} {:.2}", symbol, sim.amount_to_finance);
    println!("  Monthly Rate:       {:.6}%", sim.monthly_rate * 100.0);
    println!("  Term:               {} months", sim.loan_term_months);
    println!();

    println!("Schedule ({} payments):", outcome.schedule.len());
    println!(
        "{:>4} {:>10} {:>14} {:>10} {:>10} {:>10} {:>8} {:>8} {:>8} {:>10} {:>14}",
        "No", "Date", "Balance", "Payment", "Principal", "Interest", "Life", "Prop", "Desgr", "Total", "Type"
    );
    println!("{}", "-".repeat(120));

    for row in outcome.schedule.iter().take(24) {
        println!(
            "{:>4} {:>10} {:>14.2} {:>10.2} {:>10.2} {:>10.2} {:>8.2} {:>8.2} {:>8.2} {:>10.2} {:>14}",
            row.payment_number,
            row.payment_date.to_string(),
            row.initial_balance,
            row.payment,
            row.principal,
            row.interest,
            row.life_insurance,
            row.property_insurance,
            row.desgravamen_insurance.unwrap_or(0.0),
            row.total_payment,
            row.period_type.as_str(),
        );
    }

    if outcome.schedule.len() > 24 {
        println!("... ({} more payments)", outcome.schedule.len() - 24);
    }

    println!("\nSummary:");
    println!("  Monthly Payment:       {} {:.2}", symbol, sim.monthly_payment);
    println!("  Total Monthly Payment: {} {:.2}", symbol, sim.total_monthly_payment);
    println!("  Total Interest:        {} {:.2}", symbol, sim.total_interest);
    println!("  Total Insurance:       {} {:.2}", symbol,
        sim.total_life_insurance + sim.total_property_insurance + sim.total_desgravamen_insurance);
    println!("  Additional Costs:      {} {:.2}", symbol, sim.total_additional_costs);
    println!("  Total to Pay:          {} {:.2}", symbol, sim.total_amount_to_pay);
    println!("  NPV:                   {} {:.2}", symbol, sim.npv);
    match (sim.irr, sim.tcea) {
        (Some(irr), Some(tcea)) => {
            println!("  IRR (monthly):         {:.6}%", irr * 100.0);
            println!("  TCEA:                  {:.4}%", tcea);
        }
        _ => println!("  IRR / TCEA:            not available"),
    }
    if let (Some(rate), Some(symbol), Some(price), Some(payment)) = (
        sim.exchange_rate_used,
        sim.alternate_currency_symbol.as_deref(),
        sim.property_price_alternate,
        sim.monthly_payment_alternate,
    ) {
        println!("\nAt {:.4} soles per dollar:", rate);
        println!("  Property Price:        {} {:.2}", symbol, price);
        println!("  Monthly Payment:       {} {:.2}", symbol, payment);
    }

    if let Some(path) = &cli.csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut sink = CsvScheduleSink::new(BufWriter::new(file));
        sink.accept(sim, &outcome.schedule)?;
        sink.into_inner()?;
        println!("\nSchedule written to: {}", path.display());
    }

    if let Some(path) = &cli.json {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut sink = JsonLinesSink::new(BufWriter::new(file));
        sink.accept(sim, &outcome.schedule)?;
        std::io::Write::flush(&mut sink.into_inner())?;
        println!("Simulation written to: {}", path.display());
    }

    Ok(())
}
