use serde::{Deserialize, Serialize};

use crate::error::FcffError;
use crate::FcffResult;

/// Histogram resolution for the fair-value distribution.
pub const HISTOGRAM_BINS: usize = 50;

/// Percentile ranks reported in the percentile table.
pub const PERCENTILE_STEPS: [u32; 11] = [0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub percentile: u32,
    pub value: f64,
}

/// Distribution of simulated fair values per share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// 2.5th and 97.5th percentiles
    pub ci_95: (f64, f64),
    pub percentiles: Vec<PercentilePoint>,
    pub histogram: Vec<HistogramBin>,
    pub market_price: f64,
    /// Fraction of trials strictly below the market price
    pub shortfall_probability: f64,
    /// Market price minus the mean of the trials below it; 0 when none are
    pub mean_excess_loss: f64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Summarize simulated fair values against a market price.
pub fn summarize_fair_values(values: &[f64], market_price: f64) -> FcffResult<FairValueSummary> {
    if values.is_empty() {
        return Err(FcffError::InsufficientData(
            "At least one fair value is required".into(),
        ));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(FcffError::NonFinite {
            context: format!("fair value of trial {pos}"),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;

    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let below: Vec<f64> = sorted.iter().copied().filter(|v| *v < market_price).collect();
    let shortfall_probability = below.len() as f64 / n;
    let mean_excess_loss = if below.is_empty() {
        0.0
    } else {
        market_price - below.iter().sum::<f64>() / below.len() as f64
    };

    Ok(FairValueSummary {
        count: sorted.len(),
        mean,
        median: percentile_sorted(&sorted, 50.0),
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        ci_95: (percentile_sorted(&sorted, 2.5), percentile_sorted(&sorted, 97.5)),
        percentiles: PERCENTILE_STEPS
            .iter()
            .map(|&p| PercentilePoint {
                percentile: p,
                value: percentile_sorted(&sorted, p as f64),
            })
            .collect(),
        histogram: build_histogram(&sorted, HISTOGRAM_BINS),
        market_price,
        shortfall_probability,
        mean_excess_loss,
    })
}

/// Percentile of a **sorted**, non-empty slice with linear interpolation
/// between closest ranks.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Equal-width bins over `[min, max]`; a constant sample collapses to one bin.
fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let min_val = sorted[0];
    let max_val = sorted[sorted.len() - 1];
    let n = sorted.len() as f64;

    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| HistogramBin {
            lower: min_val + i as f64 * bin_width,
            upper: if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            },
            count: 0,
            frequency: 0.0,
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }
    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }

    bins
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(percentile_sorted(&sorted, 50.0), 3.0);
        assert_eq!(percentile_sorted(&sorted, 100.0), 5.0);
        // rank = 0.025 * 4 = 0.1 -> 1.0 * 0.9 + 2.0 * 0.1
        assert!((percentile_sorted(&sorted, 2.5) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_shortfall_and_excess_loss() {
        let values = [80.0, 90.0, 100.0, 110.0, 120.0];
        let s = summarize_fair_values(&values, 100.0).unwrap();
        // 80 and 90 are strictly below 100
        assert!((s.shortfall_probability - 0.4).abs() < 1e-12);
        // 100 - mean(80, 90) = 15
        assert!((s.mean_excess_loss - 15.0).abs() < 1e-12);
        assert_eq!(s.mean, 100.0);
        assert_eq!(s.median, 100.0);
    }

    #[test]
    fn test_no_shortfall_gives_zero_loss() {
        let s = summarize_fair_values(&[150.0, 160.0], 100.0).unwrap();
        assert_eq!(s.shortfall_probability, 0.0);
        assert_eq!(s.mean_excess_loss, 0.0);
    }

    #[test]
    fn test_histogram_counts_all_values() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let s = summarize_fair_values(&values, 500.0).unwrap();
        assert_eq!(s.histogram.len(), HISTOGRAM_BINS);
        assert_eq!(s.histogram.iter().map(|b| b.count).sum::<u32>(), 1000);
        assert_eq!(s.histogram.last().unwrap().upper, 999.0);
    }

    #[test]
    fn test_constant_sample_single_bin() {
        let s = summarize_fair_values(&[42.0; 10], 40.0).unwrap();
        assert_eq!(s.histogram.len(), 1);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.ci_95, (42.0, 42.0));
    }

    #[test]
    fn test_percentile_table_steps() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let s = summarize_fair_values(&values, 50.0).unwrap();
        assert_eq!(s.percentiles.len(), 11);
        for point in &s.percentiles {
            assert!((point.value - point.percentile as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        assert!(summarize_fair_values(&[], 10.0).is_err());
        assert!(summarize_fair_values(&[1.0, f64::NAN], 10.0).is_err());
    }
}
