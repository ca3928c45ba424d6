mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::fact_base::FactBaseArgs;
use commands::monte_carlo::{MonteCarloArgs, SampleArgs};
use commands::valuation::{ScenarioArgs, ValueArgs};

/// FCFF valuation and Monte Carlo fair-value distributions
#[derive(Parser)]
#[command(
    name = "fcff",
    version,
    about = "FCFF discounted-cash-flow valuation with Monte Carlo sampling",
    long_about = "Project ten years of free cash flow to the firm from a fact base and \
                  an assumption set, bridge to a per-share fair value, and estimate the \
                  fair-value distribution by resampling the assumptions. Set RUST_LOG \
                  for diagnostics on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the 10-year forecast table
    Forecast(ScenarioArgs),
    /// Value one scenario: firm value, equity bridge, fair value per share
    Value(ValueArgs),
    /// Roll invested capital forward and report ROIC
    Roic(ScenarioArgs),
    /// Draw one assumption set from a sampling config
    Sample(SampleArgs),
    /// Run a Monte Carlo fair-value simulation
    MonteCarlo(MonteCarloArgs),
    /// Build a fact base from fundamentals and price-history CSVs
    FactBase(FactBaseArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Forecast(args) => commands::valuation::run_forecast(args),
        Commands::Value(args) => commands::valuation::run_value(args),
        Commands::Roic(args) => commands::valuation::run_roic(args),
        Commands::Sample(args) => commands::monte_carlo::run_sample(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::FactBase(args) => commands::fact_base::run_fact_base(args),
        Commands::Version => {
            println!("fcff {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
