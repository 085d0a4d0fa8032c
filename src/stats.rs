//! Small statistical helpers used by the robust background fit.

use thiserror::Error;

/// Conversion factor from median absolute deviation to Gaussian sigma.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Errors from statistical helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// No finite values to compute from.
    #[error("insufficient data points: {total} total values, 0 valid")]
    EmptySample {
        /// Total values supplied, including non-finite ones.
        total: usize,
    },
}

/// Calculate the median of a slice of f64 values.
///
/// NaN values are filtered out before sorting; for even-length data the two
/// middle values are averaged.
pub fn median(values: &[f64]) -> Result<f64, StatsError> {
    let mut valid: Vec<f64> = values.iter().filter(|v| !v.is_nan()).copied().collect();

    if valid.is_empty() {
        return Err(StatsError::EmptySample {
            total: values.len(),
        });
    }

    valid.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = valid.len() / 2;
    let median_value = if valid.len() % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / 2.0
    } else {
        valid[mid]
    };

    Ok(median_value)
}

/// Median absolute deviation about a given center.
///
/// Multiply by [`MAD_TO_SIGMA`] to get an outlier-resistant sigma estimate.
pub fn median_absolute_deviation(values: &[f64], center: f64) -> Result<f64, StatsError> {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}
