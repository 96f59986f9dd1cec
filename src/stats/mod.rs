/// Statistics over two index-aligned series (external values, weights).
///
/// ```text
///   x: external values ─┐
///                       ├─► outliers::classify ─► inlier subset ─┐
///   y: weights ─────────┘                                        ├─► correlation::analyze
///                         (or the full series) ──────────────────┘
/// ```
///
/// Restricting the correlation to inliers is the caller's choice; the
/// analyzer never filters on its own.

pub mod correlation;
pub mod outliers;

use thiserror::Error;

pub use correlation::{analyze, CorrelationResult, CorrelationStats, Regression};
pub use outliers::{classify, OutlierClassification, DEFAULT_Z_THRESHOLD};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Series lengths differ: {x} external values vs {y} weights")]
    LengthMismatch { x: usize, y: usize },
}

pub(crate) fn ensure_same_len(x: &[f64], y: &[f64]) -> Result<(), StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    Ok(())
}

/// Arithmetic mean (NaN for an empty slice).
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (denominator `n`).
pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
