//! Reflection integration: strategies, corrections and batch orchestration.
//!
//! # Module Organization
//!
//! - **preprocess**: shoebox validation, trimming and gap masking
//! - **summation**: foreground summation, the baseline strategy
//! - **profile**: reciprocal-space profile fitting and the reference pool
//! - **corrections**: ordered chain of physical correction factors
//! - **interface**: per-batch orchestration and parallel execution
//!
//! Strategies implement the single-method [`IntegrationStrategy`] trait and
//! are selected once per run; [`FallbackStrategy`] composes two of them
//! with an explicit failure-absorption policy.

pub mod corrections;
pub mod interface;
pub mod preprocess;
pub mod profile;
pub mod summation;

use serde::{Deserialize, Serialize};

use crate::error::IntegrationFailure;
use crate::geometry::ReflectionGeometry;
use crate::pixels::shoebox::Shoebox;

pub use corrections::{Correction, CorrectionChain};
pub use interface::Integrator;
pub use preprocess::{PreprocessOutcome, Preprocessor};
pub use profile::{ProfileFittingReciprocalSpace, ReferenceProfilePool};
pub use summation::Summation;

/// Integrated intensity with its variance.
///
/// The value may be negative (background-subtracted weak or absent signal);
/// the variance never is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityEstimate {
    /// Integrated intensity in corrected counts.
    pub value: f64,
    /// Variance of the intensity.
    pub variance: f64,
}

impl IntensityEstimate {
    /// New estimate; the variance is clamped at zero to hold the invariant
    /// against floating-point cancellation.
    pub fn new(value: f64, variance: f64) -> Self {
        Self {
            value,
            variance: variance.max(0.0),
        }
    }

    /// Signal-to-noise ratio; infinite for zero variance.
    pub fn signal_to_noise(&self) -> f64 {
        if self.variance > 0.0 {
            self.value / self.variance.sqrt()
        } else {
            f64::INFINITY
        }
    }
}

/// One reflection-integration method.
///
/// Implementations read the prepared, background-subtracted shoebox and
/// produce a raw intensity estimate; they never mutate the shoebox.
pub trait IntegrationStrategy: Send + Sync {
    /// Strategy name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Integrate one reflection's shoebox.
    ///
    /// # Errors
    ///
    /// Strategy-specific [`IntegrationFailure`] kinds; see the
    /// implementations.
    fn integrate(
        &self,
        shoebox: &Shoebox,
        geometry: &ReflectionGeometry,
    ) -> Result<IntensityEstimate, IntegrationFailure>;
}

/// Composite strategy: try the primary, fall back to the secondary on the
/// failure kinds the composite absorbs.
///
/// Absorbed kinds are [`IntegrationFailure::NoReferenceProfile`] and
/// [`IntegrationFailure::NonConvergent`]; everything else propagates from
/// the primary unchanged.
#[derive(Debug, Clone)]
pub struct FallbackStrategy<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackStrategy<P, S> {
    /// Compose a primary strategy with its fallback.
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    fn absorbs(failure: &IntegrationFailure) -> bool {
        matches!(
            failure,
            IntegrationFailure::NoReferenceProfile { .. }
                | IntegrationFailure::NonConvergent { .. }
        )
    }
}

impl<P, S> IntegrationStrategy for FallbackStrategy<P, S>
where
    P: IntegrationStrategy,
    S: IntegrationStrategy,
{
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn integrate(
        &self,
        shoebox: &Shoebox,
        geometry: &ReflectionGeometry,
    ) -> Result<IntensityEstimate, IntegrationFailure> {
        match self.primary.integrate(shoebox, geometry) {
            Err(failure) if Self::absorbs(&failure) => {
                log::debug!(
                    "{} failed ({failure}), falling back to {}",
                    self.primary.name(),
                    self.secondary.name()
                );
                self.secondary.integrate(shoebox, geometry)
            }
            other => other,
        }
    }
}
