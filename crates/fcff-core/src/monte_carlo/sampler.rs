use rand::distributions::Distribution;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{LogNormal, Normal};

use crate::assumptions::AssumptionSet;
use crate::error::FcffError;
use crate::period::{Horizon, Period, FORECAST_YEARS};
use crate::time_value::decimal_from_f64;
use crate::types::Rate;
use crate::FcffResult;

/// Number of leading forecast years that hold the first-year growth draw
/// in the structured growth path.
const HIGH_GROWTH_YEARS: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    #[default]
    Normal,
    /// `mean` is the arithmetic level; the underlying normal is `(ln(mean), std)`
    LogNormal,
}

/// Sampling rule for one model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub mean: f64,
    /// A std of 0 yields the mean on every draw
    #[serde(default)]
    pub std: f64,
    /// Terminal-period mean; falls back to `mean` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_std: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_max: Option<f64>,
    #[serde(default)]
    pub distribution: DistributionKind,
    /// Revenue growth only: 5 years at the first draw, a linear glide to the
    /// terminal draw over years 6-9, then the terminal draw
    #[serde(default)]
    pub structured: bool,
}

/// Per-parameter sampling rules for a Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub revenue_growth: ParameterConfig,
    pub operating_margin: ParameterConfig,
    pub reinvestment_rate: ParameterConfig,
    pub wacc: ParameterConfig,
    pub roic_tv: ParameterConfig,
    /// Not sampled: broadcast over all 11 periods
    pub tax_rate: f64,
}

impl ParameterConfig {
    pub fn normal(mean: f64, std: f64) -> Self {
        Self {
            mean,
            std,
            terminal_mean: None,
            terminal_std: None,
            clip_min: None,
            clip_max: None,
            distribution: DistributionKind::Normal,
            structured: false,
        }
    }

    pub fn with_terminal(mut self, mean: f64, std: f64) -> Self {
        self.terminal_mean = Some(mean);
        self.terminal_std = Some(std);
        self
    }

    pub fn with_clip(mut self, min: f64, max: f64) -> Self {
        self.clip_min = Some(min);
        self.clip_max = Some(max);
        self
    }

    /// A parameter that always yields `value`.
    pub fn constant(value: f64) -> Self {
        Self::normal(value, 0.0).with_terminal(value, 0.0)
    }

    fn terminal(&self) -> (f64, f64) {
        (
            self.terminal_mean.unwrap_or(self.mean),
            self.terminal_std.unwrap_or(self.std),
        )
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let mut revenue_growth = ParameterConfig::normal(0.30, 0.02)
            .with_terminal(0.043, 0.002)
            .with_clip(-1.0, 1.0);
        revenue_growth.structured = true;

        let mut reinvestment_rate = ParameterConfig::normal(2.0, 0.2).with_clip(0.0, 3.0);
        reinvestment_rate.distribution = DistributionKind::LogNormal;

        Self {
            revenue_growth,
            operating_margin: ParameterConfig::normal(0.40, 0.03)
                .with_terminal(0.40, 0.03)
                .with_clip(-1.0, 1.0),
            reinvestment_rate,
            wacc: ParameterConfig::normal(0.09, 0.005)
                .with_terminal(0.084, 0.002)
                .with_clip(0.01, 0.99),
            roic_tv: ParameterConfig::normal(0.2, 0.02).with_clip(0.1, 0.3),
            tax_rate: 0.182,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Draw one full assumption set.
///
/// Parameters are drawn in a fixed order (revenue growth, operating margin,
/// reinvestment rate, WACC, terminal ROIC) so a seeded RNG reproduces the
/// same scenario.
pub fn sample<R: Rng + ?Sized>(config: &SamplingConfig, rng: &mut R) -> FcffResult<AssumptionSet> {
    let revenue_growth = if config.revenue_growth.structured {
        structured_growth(&config.revenue_growth, rng)?
    } else {
        horizon_draws("revenue_growth", &config.revenue_growth, rng)?
    };
    let operating_margin = horizon_draws("operating_margin", &config.operating_margin, rng)?;

    let mut reinvestment_rate = [Decimal::ZERO; FORECAST_YEARS];
    for (idx, slot) in reinvestment_rate.iter_mut().enumerate() {
        let period = Period::Year(idx as u8 + 1);
        let p = &config.reinvestment_rate;
        *slot = to_decimal("reinvestment_rate", period, draw("reinvestment_rate", p, p.mean, p.std, rng)?)?;
    }

    let wacc = horizon_draws("wacc", &config.wacc, rng)?;

    let p = &config.roic_tv;
    let roic_tv = to_decimal("roic_tv", Period::Terminal, draw("roic_tv", p, p.mean, p.std, rng)?)?;

    let tax_rate = Horizon::uniform(to_decimal("tax_rate", Period::Terminal, config.tax_rate)?);

    Ok(AssumptionSet {
        revenue_growth,
        operating_margin,
        tax_rate,
        reinvestment_rate,
        wacc,
        roic_tv,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Ten independent yearly draws plus one terminal draw.
fn horizon_draws<R: Rng + ?Sized>(
    parameter: &str,
    config: &ParameterConfig,
    rng: &mut R,
) -> FcffResult<Horizon<Rate>> {
    let mut years = [Decimal::ZERO; FORECAST_YEARS];
    for (idx, slot) in years.iter_mut().enumerate() {
        let value = draw(parameter, config, config.mean, config.std, rng)?;
        *slot = to_decimal(parameter, Period::Year(idx as u8 + 1), value)?;
    }
    let (t_mean, t_std) = config.terminal();
    let terminal = to_decimal(parameter, Period::Terminal, draw(parameter, config, t_mean, t_std, rng)?)?;
    Ok(Horizon::new(years, terminal))
}

/// 5 years at `g1`, the interior points of a 6-point linear space from
/// `g1` to `g_terminal` for years 6-9, then `g_terminal` for year 10 and
/// the terminal period.
fn structured_growth<R: Rng + ?Sized>(config: &ParameterConfig, rng: &mut R) -> FcffResult<Horizon<Rate>> {
    let g1 = draw("revenue_growth", config, config.mean, config.std, rng)?;
    let (t_mean, t_std) = config.terminal();
    let g_terminal = draw("revenue_growth", config, t_mean, t_std, rng)?;

    let g1 = to_decimal("revenue_growth", Period::Year(1), g1)?;
    let g_terminal = to_decimal("revenue_growth", Period::Terminal, g_terminal)?;

    let glide_steps = Decimal::from(FORECAST_YEARS - HIGH_GROWTH_YEARS);
    let mut years = [g_terminal; FORECAST_YEARS];
    for (idx, slot) in years.iter_mut().enumerate() {
        if idx < HIGH_GROWTH_YEARS {
            *slot = g1;
        } else if idx < FORECAST_YEARS - 1 {
            let k = Decimal::from(idx + 1 - HIGH_GROWTH_YEARS);
            *slot = g1 + (g_terminal - g1) * k / glide_steps;
        }
    }
    Ok(Horizon::new(years, g_terminal))
}

/// One clipped draw from the parameter's distribution.
fn draw<R: Rng + ?Sized>(
    parameter: &str,
    config: &ParameterConfig,
    mean: f64,
    std: f64,
    rng: &mut R,
) -> FcffResult<f64> {
    if !mean.is_finite() || !std.is_finite() || std < 0.0 {
        return Err(FcffError::InvalidDistribution {
            parameter: parameter.into(),
            reason: format!("mean and std must be finite with std >= 0 (got mean={mean}, std={std})"),
        });
    }
    let lower = config.clip_min.unwrap_or(f64::NEG_INFINITY);
    let upper = config.clip_max.unwrap_or(f64::INFINITY);
    if lower > upper {
        return Err(FcffError::InvalidDistribution {
            parameter: parameter.into(),
            reason: format!("clip_min ({lower}) exceeds clip_max ({upper})"),
        });
    }

    let raw = match config.distribution {
        DistributionKind::Normal if std == 0.0 => mean,
        DistributionKind::Normal => {
            let n = Normal::new(mean, std).map_err(|e| FcffError::InvalidDistribution {
                parameter: parameter.into(),
                reason: format!("Invalid Normal parameters: {e}"),
            })?;
            n.sample(rng)
        }
        DistributionKind::LogNormal => {
            if mean <= 0.0 {
                return Err(FcffError::InvalidDistribution {
                    parameter: parameter.into(),
                    reason: format!("lognormal mean must be positive (got {mean})"),
                });
            }
            if std == 0.0 {
                mean
            } else {
                let ln = LogNormal::new(mean.ln(), std).map_err(|e| FcffError::InvalidDistribution {
                    parameter: parameter.into(),
                    reason: format!("Invalid LogNormal parameters: {e}"),
                })?;
                ln.sample(rng)
            }
        }
    };

    Ok(raw.max(lower).min(upper))
}

fn to_decimal(parameter: &str, period: Period, value: f64) -> FcffResult<Decimal> {
    decimal_from_f64(value, &format!("{parameter} draw at {period}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
