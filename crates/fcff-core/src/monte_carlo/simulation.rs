use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::FcffError;
use crate::fact_base::FactBase;
use crate::time_value::f64_from_decimal;
use crate::types::{with_metadata, ComputationOutput, MarketQuote, PRECISION_F64};
use crate::valuation::value_assumptions;
use crate::FcffResult;

use super::sampler::{sample, SamplingConfig};
use super::statistics::{summarize_fair_values, FairValueSummary};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a Monte Carlo fair-value run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McValuationInput {
    pub fact_base: FactBase,
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Number of trials (minimum 1).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Optional seed for reproducibility.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Return every trial's fair value alongside the summary.
    #[serde(default)]
    pub include_samples: bool,
}

fn default_num_simulations() -> u32 {
    1_000
}

/// Output of a Monte Carlo fair-value run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McValuationOutput {
    pub num_simulations: u32,
    pub summary: FairValueSummary,
    pub market: MarketQuote,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fair_values: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Sample, forecast and valuate `n_trials` independent scenarios, returning
/// each trial's fair value per share in trial order.
///
/// Each trial owns an RNG seeded from a master stream drawn up front, so the
/// sequence is identical whether trials run sequentially or on the rayon
/// pool. Any failing trial fails the run, and the error reported is the one
/// from the lowest-indexed failing trial.
pub fn run_monte_carlo(
    fact_base: &FactBase,
    config: &SamplingConfig,
    n_trials: usize,
    seed: Option<u64>,
) -> FcffResult<Vec<f64>> {
    if n_trials == 0 {
        return Err(FcffError::InvalidInput {
            field: "num_simulations".into(),
            reason: "Must be at least 1".into(),
        });
    }
    fact_base.validate()?;

    let mut master = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let trial_seeds: Vec<u64> = (0..n_trials).map(|_| master.gen()).collect();

    #[cfg(feature = "parallel")]
    let values = trial_seeds
        .par_iter()
        .enumerate()
        .map(|(trial, &trial_seed)| run_trial(fact_base, config, trial, trial_seed))
        .collect::<Vec<FcffResult<f64>>>()
        .into_iter()
        .collect::<FcffResult<Vec<f64>>>()?;

    #[cfg(not(feature = "parallel"))]
    let values = trial_seeds
        .iter()
        .enumerate()
        .map(|(trial, &trial_seed)| run_trial(fact_base, config, trial, trial_seed))
        .collect::<FcffResult<Vec<f64>>>()?;

    tracing::debug!(
        company = %fact_base.company,
        trials = n_trials,
        seeded = seed.is_some(),
        "monte carlo run complete"
    );

    Ok(values)
}

/// Monte Carlo run plus distribution summary, wrapped in the computation
/// envelope.
pub fn run_valuation_simulation(
    input: &McValuationInput,
) -> FcffResult<ComputationOutput<McValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.num_simulations < 1 {
        return Err(FcffError::InvalidInput {
            field: "num_simulations".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if input.num_simulations < 100 {
        warnings.push(format!(
            "Only {} simulations; percentile estimates are unstable below 100",
            input.num_simulations
        ));
    }

    let values = run_monte_carlo(
        &input.fact_base,
        &input.sampling,
        input.num_simulations as usize,
        input.seed,
    )?;

    let market = input.fact_base.market_quote();
    let market_price = f64_from_decimal(market.price, "market price")?;
    let summary = summarize_fair_values(&values, market_price)?;

    if summary.shortfall_probability > 0.5 {
        warnings.push(format!(
            "Market price {market_price:.2} exceeds the median simulated fair value ({:.1}% shortfall)",
            summary.shortfall_probability * 100.0
        ));
    }

    let output = McValuationOutput {
        num_simulations: input.num_simulations,
        summary,
        market,
        fair_values: input.include_samples.then_some(values),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Monte Carlo FCFF Valuation (per-trial assumption sampling)",
        &serde_json::json!({
            "company": input.fact_base.company,
            "num_simulations": input.num_simulations,
            "seed": input.seed,
            "sampling": input.sampling,
        }),
        warnings,
        elapsed,
        PRECISION_F64,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn run_trial(
    fact_base: &FactBase,
    config: &SamplingConfig,
    trial: usize,
    trial_seed: u64,
) -> FcffResult<f64> {
    let mut rng = StdRng::seed_from_u64(trial_seed);
    sample(config, &mut rng)
        .and_then(|assumptions| value_assumptions(fact_base, &assumptions))
        .and_then(|valuation| f64_from_decimal(valuation.fair_value_per_share, "fair value per share"))
        .map_err(|source| FcffError::TrialFailed {
            trial,
            source: Box::new(source),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::sampler::ParameterConfig;
    use crate::types::Currency;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const SEED: u64 = 42;

    fn sample_fact_base() -> FactBase {
        FactBase {
            company: "TEST".into(),
            fiscal_year: Some("FY 2024".into()),
            currency: Currency::USD,
            base_revenue: dec!(1000),
            base_ebit: dec!(200),
            base_tax_rate: dec!(0.21),
            cash: dec!(100),
            total_debt: dec!(300),
            shares_outstanding: dec!(50),
            invested_capital: dec!(800),
            anchor_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            market_reference_date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            market_price: dec!(40),
        }
    }

    fn basic_input() -> McValuationInput {
        McValuationInput {
            fact_base: sample_fact_base(),
            sampling: SamplingConfig::default(),
            num_simulations: 500,
            seed: Some(SEED),
            include_samples: false,
        }
    }

    #[test]
    fn test_exact_trial_count_all_finite() {
        let values = run_monte_carlo(&sample_fact_base(), &SamplingConfig::default(), 250, Some(SEED)).unwrap();
        assert_eq!(values.len(), 250);
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_seeded_reproducibility() {
        let cfg = SamplingConfig::default();
        let a = run_monte_carlo(&sample_fact_base(), &cfg, 100, Some(SEED)).unwrap();
        let b = run_monte_carlo(&sample_fact_base(), &cfg, 100, Some(SEED)).unwrap();
        assert_eq!(a, b);
        let c = run_monte_carlo(&sample_fact_base(), &cfg, 100, Some(SEED + 1)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_trials_follow_master_seed_stream() {
        let fb = sample_fact_base();
        let cfg = SamplingConfig::default();
        let values = run_monte_carlo(&fb, &cfg, 20, Some(SEED)).unwrap();

        // Rebuild the same sequence trial by trial
        let mut master = StdRng::seed_from_u64(SEED);
        for (trial, value) in values.iter().enumerate() {
            let trial_seed: u64 = master.gen();
            let expected = run_trial(&fb, &cfg, trial, trial_seed).unwrap();
            assert_eq!(*value, expected, "trial {trial}");
        }
    }

    #[test]
    fn test_constant_config_collapses_distribution() {
        let cfg = SamplingConfig {
            revenue_growth: ParameterConfig::constant(0.05),
            operating_margin: ParameterConfig::constant(0.20),
            reinvestment_rate: ParameterConfig::normal(2.0, 0.0),
            wacc: ParameterConfig::constant(0.09),
            roic_tv: ParameterConfig::normal(0.15, 0.0),
            tax_rate: 0.25,
        };
        let values = run_monte_carlo(&sample_fact_base(), &cfg, 10, Some(SEED)).unwrap();
        assert!(values.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_failing_trial_halts_run() {
        let mut cfg = SamplingConfig::default();
        // Terminal WACC pinned below terminal growth breaks the Gordon condition
        cfg.wacc = ParameterConfig::constant(0.02);
        let err = run_monte_carlo(&sample_fact_base(), &cfg, 10, Some(SEED)).unwrap_err();
        match err {
            FcffError::TrialFailed { source, .. } => {
                assert!(matches!(*source, FcffError::FinancialImpossibility(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reports_lowest_failing_trial() {
        let fb = sample_fact_base();
        let mut cfg = SamplingConfig::default();
        cfg.revenue_growth = ParameterConfig::constant(0.04);
        // Terminal WACC straddles terminal growth, so roughly half the trials fail
        cfg.wacc = ParameterConfig::normal(0.09, 0.01).with_terminal(0.04, 0.01);

        let mut master = StdRng::seed_from_u64(SEED);
        let first_failure = (0..64)
            .map(|trial| (trial, master.gen::<u64>()))
            .find(|&(trial, trial_seed)| run_trial(&fb, &cfg, trial, trial_seed).is_err())
            .map(|(trial, _)| trial)
            .expect("some trial breaks the Gordon condition");

        match run_monte_carlo(&fb, &cfg, 64, Some(SEED)).unwrap_err() {
            FcffError::TrialFailed { trial, .. } => assert_eq!(trial, first_failure),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_trials_rejected() {
        assert!(run_monte_carlo(&sample_fact_base(), &SamplingConfig::default(), 0, None).is_err());
    }

    #[test]
    fn test_envelope_summary() {
        let out = run_valuation_simulation(&basic_input()).unwrap();
        assert_eq!(out.metadata.precision, PRECISION_F64);
        assert_eq!(out.result.summary.count, 500);
        assert!(out.result.fair_values.is_none());
        let s = &out.result.summary;
        assert!(s.ci_95.0 <= s.median && s.median <= s.ci_95.1);
        assert_eq!(s.market_price, 40.0);
    }

    #[test]
    fn test_envelope_include_samples() {
        let mut input = basic_input();
        input.num_simulations = 50;
        input.include_samples = true;
        let out = run_valuation_simulation(&input).unwrap();
        assert_eq!(out.result.fair_values.as_ref().map(Vec::len), Some(50));
        assert!(out.warnings.iter().any(|w| w.contains("below 100")));
    }

    #[test]
    fn test_input_defaults_from_json() {
        let json = serde_json::json!({
            "fact_base": serde_json::to_value(sample_fact_base()).unwrap(),
            "seed": 7
        });
        let input: McValuationInput = serde_json::from_value(json).unwrap();
        assert_eq!(input.num_simulations, 1_000);
        assert_eq!(input.sampling, SamplingConfig::default());
        assert!(!input.include_samples);
    }
}
