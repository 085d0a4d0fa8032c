//! Per-shoebox background estimation and subtraction.
//!
//! Only background-flagged pixels contribute to the fit; foreground pixels
//! are excluded from parameter estimation but still receive the subtracted
//! background value. Three models are available:
//!
//! - **Constant**: mean background level, for tiny shoeboxes
//! - **Planar**: least-squares plane over (row, col)
//! - **Robust**: iterative planar fit that re-classifies outlier background
//!   pixels (k-sigma residual cutoff) as invalid and refits
//!
//! Variance is propagated per pixel as Poisson-like `max(raw, 1)` plus the
//! background fit variance added in quadrature.

pub(crate) mod planar;
pub(crate) mod robust;

use serde::{Deserialize, Serialize};

use crate::config::BackgroundConfig;
use crate::error::BackgroundError;
use crate::pixels::graph::PixelKey;
use crate::pixels::shoebox::{MaskCode, Shoebox};

/// Background model selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BackgroundModel {
    /// Mean of the background pixels; degenerate plane for tiny shoeboxes.
    Constant,
    /// Least-squares plane over (row, col).
    Planar,
    /// Iterative planar fit with k-sigma outlier re-masking.
    Robust {
        /// Cap on fit/re-mask iterations.
        max_iterations: usize,
        /// Residual cutoff in robust sigmas.
        sigma_cutoff: f64,
    },
}

/// Fitted background surface for one shoebox.
///
/// The plane is expressed in shoebox-local coordinates and is constant
/// across frames: `value = offset + row_slope * row + col_slope * col`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPlane {
    /// Background level at the shoebox origin.
    pub offset: f64,
    /// Gradient along rows.
    pub row_slope: f64,
    /// Gradient along columns.
    pub col_slope: f64,
    /// Mean squared residual of background pixels about the plane.
    pub residual_variance: f64,
    /// Variance of the fitted background level (residual variance over the
    /// sample count); added to each pixel's variance on subtraction.
    pub fit_variance: f64,
    /// Number of background pixels that contributed to the fit.
    pub n_background: usize,
}

impl BackgroundPlane {
    /// Background value at a shoebox-local (row, col).
    pub fn value_at(&self, row: usize, col: usize) -> f64 {
        self.offset + self.row_slope * row as f64 + self.col_slope * col as f64
    }
}

/// Collect (pixel key, raw value) samples from background-flagged pixels.
pub(crate) fn background_samples(shoebox: &Shoebox) -> Vec<(PixelKey, f64)> {
    shoebox
        .mask
        .indexed_iter()
        .filter(|(_, &code)| code == MaskCode::Background)
        .map(|(key, _)| (key, shoebox.data[key]))
        .collect()
}

/// Fits a background model to a shoebox and subtracts it in place.
#[derive(Debug, Clone)]
pub struct BackgroundEstimator {
    model: BackgroundModel,
    min_background_pixels: usize,
}

impl BackgroundEstimator {
    /// Estimator from configuration.
    pub fn new(config: &BackgroundConfig) -> Self {
        Self {
            model: config.model,
            min_background_pixels: config.min_background_pixels,
        }
    }

    /// Fit the background on background-flagged pixels and subtract it from
    /// every usable pixel, filling the shoebox's variance buffer.
    ///
    /// The robust model may re-classify background pixels as invalid; the
    /// shoebox mask reflects that on return.
    ///
    /// # Errors
    ///
    /// - [`BackgroundError::InsufficientBackground`] with fewer background
    ///   pixels than the configured minimum (before or after re-masking).
    /// - [`BackgroundError::NonConvergent`] when robust iteration hits its
    ///   cap without a stable outlier mask.
    pub fn estimate_and_subtract(
        &self,
        shoebox: &mut Shoebox,
    ) -> Result<BackgroundPlane, BackgroundError> {
        let plane = match self.model {
            BackgroundModel::Constant | BackgroundModel::Planar => {
                let samples = background_samples(shoebox);
                if samples.len() < self.min_background_pixels {
                    return Err(BackgroundError::InsufficientBackground {
                        available: samples.len(),
                        required: self.min_background_pixels,
                    });
                }
                match self.model {
                    BackgroundModel::Constant => planar::fit_constant(&samples),
                    _ => planar::fit_plane(&samples),
                }
            }
            BackgroundModel::Robust {
                max_iterations,
                sigma_cutoff,
            } => robust::fit_robust(
                shoebox,
                max_iterations,
                sigma_cutoff,
                self.min_background_pixels,
            )?,
        };

        subtract(shoebox, &plane);
        Ok(plane)
    }
}

/// Subtract the plane from every usable pixel and fill per-pixel variance.
fn subtract(shoebox: &mut Shoebox, plane: &BackgroundPlane) {
    let Shoebox {
        data,
        mask,
        variance,
        ..
    } = shoebox;
    ndarray::Zip::indexed(data)
        .and(variance)
        .and(&*mask)
        .for_each(|(_, row, col), value, var, &code| {
            if code == MaskCode::Invalid {
                return;
            }
            *var = value.max(1.0) + plane.fit_variance;
            *value -= plane.value_at(row, col);
        });
}
