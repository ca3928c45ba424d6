use napi::Result as NapiResult;
use napi_derive::napi;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use fcff_core::assumptions::AssumptionSet;
use fcff_core::fact_base::FactBase;
use fcff_core::monte_carlo::{McValuationInput, SamplingConfig};
use fcff_core::valuation::{ForecastSeries, ValuationInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// A fact base paired with a forecast that was produced earlier.
#[derive(Deserialize)]
struct ForecastedInput {
    fact_base: FactBase,
    forecast: ForecastSeries,
}

#[derive(Deserialize)]
struct SampleInput {
    #[serde(default)]
    sampling: SamplingConfig,
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct RunInput {
    fact_base: FactBase,
    #[serde(default)]
    sampling: SamplingConfig,
    num_simulations: u32,
    seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Deterministic valuation
// ---------------------------------------------------------------------------

/// `{ fact_base, assumptions }` -> forecast series
#[napi]
pub fn forecast(input_json: String) -> NapiResult<String> {
    let input: ValuationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = fcff_core::valuation::forecast(&input.fact_base, &input.assumptions)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// `{ fact_base, forecast }` -> valuation result
#[napi]
pub fn valuate(input_json: String) -> NapiResult<String> {
    let input: ForecastedInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        fcff_core::valuation::valuate(&input.fact_base, &input.forecast).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// `{ fact_base, forecast }` -> ROIC series
#[napi]
pub fn track_roic(input_json: String) -> NapiResult<String> {
    let input: ForecastedInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = fcff_core::valuation::track_roic(&input.fact_base, &input.forecast)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// `{ fact_base, assumptions }` -> full valuation envelope
#[napi]
pub fn value_company(input_json: String) -> NapiResult<String> {
    let input: ValuationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = fcff_core::valuation::value_company(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Monte Carlo
// ---------------------------------------------------------------------------

/// `{ sampling?, seed? }` -> one sampled assumption set
#[napi]
pub fn sample_assumptions(input_json: String) -> NapiResult<String> {
    let input: SampleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let output: AssumptionSet =
        fcff_core::monte_carlo::sample(&input.sampling, &mut rng).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// `{ fact_base, sampling?, num_simulations, seed? }` -> raw fair values
#[napi]
pub fn run_monte_carlo(input_json: String) -> NapiResult<String> {
    let input: RunInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = fcff_core::monte_carlo::run_monte_carlo(
        &input.fact_base,
        &input.sampling,
        input.num_simulations as usize,
        input.seed,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Monte Carlo run with distribution summary in the computation envelope
#[napi]
pub fn run_valuation_simulation(input_json: String) -> NapiResult<String> {
    let input: McValuationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        fcff_core::monte_carlo::run_valuation_simulation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
