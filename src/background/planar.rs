//! Least-squares plane fitting over background-flagged pixels.

use nalgebra::{Matrix3, Vector3};

use super::BackgroundPlane;
use crate::pixels::graph::PixelKey;

/// Fit `value = offset + row_slope * row + col_slope * col` to the samples
/// by ordinary least squares (normal equations).
///
/// A degenerate sample geometry (all background pixels collinear, or fewer
/// than three of them) makes the normal matrix singular; the fit then falls
/// back to the constant model.
pub(crate) fn fit_plane(samples: &[(PixelKey, f64)]) -> BackgroundPlane {
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for &((_, row, col), value) in samples {
        let basis = Vector3::new(1.0, row as f64, col as f64);
        ata += basis * basis.transpose();
        atb += basis * value;
    }

    match ata.lu().solve(&atb) {
        Some(coefficients) => finish_fit(
            samples,
            coefficients[0],
            coefficients[1],
            coefficients[2],
        ),
        None => {
            log::debug!(
                "plane fit singular for {} background pixels, using constant model",
                samples.len()
            );
            fit_constant(samples)
        }
    }
}

/// Fit a constant background level (mean of the samples).
pub(crate) fn fit_constant(samples: &[(PixelKey, f64)]) -> BackgroundPlane {
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&(_, v)| v).sum::<f64>() / n;
    finish_fit(samples, mean, 0.0, 0.0)
}

fn finish_fit(
    samples: &[(PixelKey, f64)],
    offset: f64,
    row_slope: f64,
    col_slope: f64,
) -> BackgroundPlane {
    let n = samples.len() as f64;
    let residual_variance = samples
        .iter()
        .map(|&((_, row, col), value)| {
            let fitted = offset + row_slope * row as f64 + col_slope * col as f64;
            (value - fitted).powi(2)
        })
        .sum::<f64>()
        / n;

    BackgroundPlane {
        offset,
        row_slope,
        col_slope,
        residual_variance,
        fit_variance: residual_variance / n,
        n_background: samples.len(),
    }
}
