use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use fcff_core::monte_carlo::{self, McValuationInput, SamplingConfig};

use crate::input;

/// Arguments for drawing a single assumption set
#[derive(Args)]
pub struct SampleArgs {
    /// Path to a JSON/YAML sampling config (defaults apply to omitted parameters)
    #[arg(long)]
    pub input: Option<String>,

    /// Seed for reproducible draws
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for a Monte Carlo fair-value run
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to a JSON/YAML file with `fact_base` and optional `sampling`
    #[arg(long)]
    pub input: Option<String>,

    /// Number of trials (overrides the input file)
    #[arg(long, alias = "trials")]
    pub simulations: Option<u32>,

    /// Seed for reproducible runs (overrides the input file)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Include every trial's fair value in the output
    #[arg(long)]
    pub include_samples: bool,
}

pub fn run_sample(args: SampleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config: SamplingConfig = input::load(args.input.as_deref())?.unwrap_or_default();
    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let assumptions = monte_carlo::sample(&config, &mut rng)?;
    Ok(serde_json::to_value(assumptions)?)
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut mc_input: McValuationInput = input::require(args.input.as_deref(), "monte-carlo")?;
    if let Some(n) = args.simulations {
        mc_input.num_simulations = n;
    }
    if args.seed.is_some() {
        mc_input.seed = args.seed;
    }
    mc_input.include_samples |= args.include_samples;

    tracing::info!(
        company = %mc_input.fact_base.company,
        simulations = mc_input.num_simulations,
        "starting monte carlo run"
    );
    let result = monte_carlo::run_valuation_simulation(&mc_input)?;
    Ok(serde_json::to_value(result)?)
}
