//! Summation integration: sum the background-corrected foreground.

use crate::error::IntegrationFailure;
use crate::geometry::ReflectionGeometry;
use crate::integrate::{IntegrationStrategy, IntensityEstimate};
use crate::pixels::shoebox::{MaskCode, Shoebox};

/// Baseline strategy: intensity is the sum of foreground pixel values,
/// variance the sum of their per-pixel variances.
///
/// Deterministic and cheap; used directly or as the fallback for profile
/// fitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Summation;

impl IntegrationStrategy for Summation {
    fn name(&self) -> &'static str {
        "summation"
    }

    fn integrate(
        &self,
        shoebox: &Shoebox,
        _geometry: &ReflectionGeometry,
    ) -> Result<IntensityEstimate, IntegrationFailure> {
        if !shoebox.is_consistent() {
            return Err(IntegrationFailure::InvalidRegion);
        }

        let mut value = 0.0;
        let mut variance = 0.0;
        let mut pixels = 0usize;
        for (key, &code) in shoebox.mask.indexed_iter() {
            if code == MaskCode::Foreground {
                value += shoebox.data[key];
                variance += shoebox.variance[key];
                pixels += 1;
            }
        }

        if pixels == 0 {
            return Err(IntegrationFailure::EmptyForeground);
        }

        Ok(IntensityEstimate::new(value, variance))
    }
}
