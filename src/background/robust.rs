//! Robust iterative background fitting with outlier re-masking.

use super::{background_samples, planar::fit_plane, BackgroundPlane};
use crate::error::BackgroundError;
use crate::pixels::shoebox::{MaskCode, Shoebox};
use crate::stats::{median, median_absolute_deviation, MAD_TO_SIGMA};

/// Iteratively fit a plane, re-classifying background pixels whose residual
/// exceeds `sigma_cutoff` robust sigmas as invalid, until the outlier mask
/// is stable or the iteration cap is hit.
///
/// The sigma estimate uses the median absolute deviation of the residuals,
/// so a single hot pixel cannot inflate the cutoff and shield itself.
///
/// # Errors
///
/// - [`BackgroundError::InsufficientBackground`] when re-masking leaves
///   fewer than `min_pixels` background pixels.
/// - [`BackgroundError::NonConvergent`] when the cap is reached with the
///   outlier mask still changing.
pub(crate) fn fit_robust(
    shoebox: &mut Shoebox,
    max_iterations: usize,
    sigma_cutoff: f64,
    min_pixels: usize,
) -> Result<BackgroundPlane, BackgroundError> {
    for iteration in 0..max_iterations {
        let samples = background_samples(shoebox);
        if samples.len() < min_pixels {
            return Err(BackgroundError::InsufficientBackground {
                available: samples.len(),
                required: min_pixels,
            });
        }

        let plane = fit_plane(&samples);

        let residuals: Vec<f64> = samples
            .iter()
            .map(|&((_, row, col), value)| value - plane.value_at(row, col))
            .collect();
        let center = median(&residuals).unwrap_or(0.0);
        let mad = median_absolute_deviation(&residuals, center).unwrap_or(0.0);
        let sigma = MAD_TO_SIGMA * mad;

        if sigma < f64::EPSILON {
            // Residuals are flat; nothing left to reject.
            return Ok(plane);
        }

        let cutoff = sigma_cutoff * sigma;
        let outliers: Vec<_> = samples
            .iter()
            .zip(&residuals)
            .filter(|(_, &residual)| residual.abs() > cutoff)
            .map(|(&(key, _), _)| key)
            .collect();

        if outliers.is_empty() {
            return Ok(plane);
        }

        log::debug!(
            "robust background iteration {iteration}: re-masking {} outlier pixels (sigma {sigma:.3})",
            outliers.len()
        );
        for key in outliers {
            shoebox.mask[key] = MaskCode::Invalid;
        }
    }

    Err(BackgroundError::NonConvergent {
        iterations: max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::aabb::Aabb;
    use approx::assert_relative_eq;

    fn flat_shoebox(rows: usize, cols: usize, level: f64) -> Shoebox {
        let mut shoebox = Shoebox::new(Aabb::single_frame(0, 0, rows - 1, cols - 1));
        shoebox.data.fill(level);
        shoebox
    }

    #[test]
    fn test_clean_background_converges_first_pass() {
        let mut shoebox = flat_shoebox(8, 8, 5.0);
        let plane = fit_robust(&mut shoebox, 5, 3.0, 4).unwrap();
        assert_relative_eq!(plane.offset, 5.0, epsilon = 1e-9);
        assert_eq!(shoebox.count(MaskCode::Invalid), 0);
    }

    #[test]
    fn test_hot_pixel_is_re_masked() {
        let mut shoebox = flat_shoebox(8, 8, 5.0);
        // Mild texture so the robust sigma is nonzero.
        for ((_, r, c), v) in shoebox.data.indexed_iter_mut() {
            *v += if (r + c) % 2 == 0 { 0.1 } else { -0.1 };
        }
        shoebox.data[[0, 3, 3]] = 500.0;

        let plane = fit_robust(&mut shoebox, 5, 3.0, 4).unwrap();
        assert_eq!(shoebox.mask[[0, 3, 3]], MaskCode::Invalid);
        assert!(plane.offset < 10.0, "hot pixel leaked into fit: {}", plane.offset);
    }

    #[test]
    fn test_re_masking_below_minimum_is_insufficient() {
        // Half the pixels are wildly off; re-masking them drops the count
        // below the minimum.
        let mut shoebox = flat_shoebox(2, 4, 5.0);
        shoebox.data[[0, 0, 0]] = 1000.0;
        shoebox.data[[0, 0, 1]] = 1000.0;
        shoebox.data[[0, 0, 2]] = 1000.0;

        let result = fit_robust(&mut shoebox, 10, 1.0, 7);
        assert!(matches!(
            result,
            Err(BackgroundError::InsufficientBackground { required: 7, .. })
        ));
    }

    #[test]
    fn test_iteration_cap_reports_non_convergent() {
        // A spread of values wide enough that each pass finds new outliers.
        let mut shoebox = flat_shoebox(6, 6, 0.0);
        for ((_, r, c), v) in shoebox.data.indexed_iter_mut() {
            *v = ((r * 6 + c) as f64).powi(2);
        }

        let result = fit_robust(&mut shoebox, 1, 1.0, 4);
        assert!(matches!(
            result,
            Err(BackgroundError::NonConvergent { iterations: 1 })
        ));
    }
}
