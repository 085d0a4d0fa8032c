//! Reflection records flowing through the integration pipeline.

use crate::error::IntegrationFailure;
use crate::geometry::ReflectionGeometry;
use crate::integrate::IntensityEstimate;
use crate::pixels::shoebox::Shoebox;

/// One predicted reflection and its extracted pixel data.
#[derive(Debug, Clone)]
pub struct Reflection {
    /// Caller-assigned identifier, echoed back in the outcome.
    pub id: usize,
    /// Diffraction geometry at this reflection.
    pub geometry: ReflectionGeometry,
    /// Extracted pixel block around the predicted position.
    pub shoebox: Shoebox,
}

impl Reflection {
    /// Reflection from its parts.
    pub fn new(id: usize, geometry: ReflectionGeometry, shoebox: Shoebox) -> Self {
        Self {
            id,
            geometry,
            shoebox,
        }
    }
}

/// Per-reflection result of a batch run.
///
/// Failures are carried as values so one bad reflection never aborts the
/// batch; outcomes keep the input order.
#[derive(Debug, Clone)]
pub struct ReflectionOutcome {
    /// Identifier of the input reflection.
    pub id: usize,
    /// Corrected intensity, or the reason this reflection failed.
    pub result: Result<IntensityEstimate, IntegrationFailure>,
}

impl ReflectionOutcome {
    /// True when integration succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
