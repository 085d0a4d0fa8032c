//! Error types for the spot finding and integration pipeline.
//!
//! Per-reflection problems are captured as [`IntegrationFailure`] values and
//! attached to that reflection's outcome; they never abort the batch. Only a
//! malformed global input (an empty batch) surfaces as [`BatchError`].

use thiserror::Error;

use crate::integrate::IntensityEstimate;

/// Errors from connected-component extraction over a pixel region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The foreground mask has a zero-sized dimension.
    #[error("invalid pixel region: {frames}x{rows}x{cols} mask is empty")]
    InvalidRegion {
        /// Number of frames in the mask.
        frames: usize,
        /// Number of rows in the mask.
        rows: usize,
        /// Number of columns in the mask.
        cols: usize,
    },
}

/// Errors from background estimation on a single shoebox.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackgroundError {
    /// Not enough background-flagged pixels to fit the model.
    #[error("insufficient background pixels: {available} available, {required} required")]
    InsufficientBackground {
        /// Number of background pixels found.
        available: usize,
        /// Configured minimum.
        required: usize,
    },

    /// Robust iteration hit its cap without stabilizing the outlier mask.
    #[error("robust background fit did not converge after {iterations} iterations")]
    NonConvergent {
        /// Iteration cap that was reached.
        iterations: usize,
    },
}

/// Why the preprocessor rejected a shoebox.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Every pixel fell outside the active detector area.
    #[error("shoebox lies entirely outside the active detector area")]
    OutsideDetector,

    /// Too few pixels survived trimming and gap masking.
    #[error("too few usable pixels: {valid} valid, {required} required")]
    TooFewValidPixels {
        /// Usable pixels remaining after masking.
        valid: usize,
        /// Configured minimum.
        required: usize,
    },

    /// No foreground pixels survived masking.
    #[error("no foreground pixels after masking")]
    NoForeground,
}

/// Per-reflection failure attached to that reflection's outcome.
///
/// The taxonomy follows the pipeline stages: structural
/// ([`InvalidRegion`](Self::InvalidRegion)), data sufficiency
/// ([`InsufficientBackground`](Self::InsufficientBackground),
/// [`NoReferenceProfile`](Self::NoReferenceProfile)), convergence
/// ([`NonConvergent`](Self::NonConvergent)), geometry
/// ([`DegenerateGeometry`](Self::DegenerateGeometry)) and preprocessor
/// rejection ([`Rejected`](Self::Rejected)).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationFailure {
    /// Shoebox data, mask and variance buffers disagree in shape, or the
    /// shoebox is empty.
    #[error("malformed shoebox region")]
    InvalidRegion,

    /// Not enough background pixels for the background fit.
    #[error("insufficient background pixels: {available} available, {required} required")]
    InsufficientBackground {
        /// Number of background pixels found.
        available: usize,
        /// Configured minimum.
        required: usize,
    },

    /// Robust background fit hit its iteration cap.
    #[error("background fit did not converge after {iterations} iterations")]
    NonConvergent {
        /// Iteration cap that was reached.
        iterations: usize,
    },

    /// The reference profile pool has no profile for this detector region.
    #[error("no reference profile for detector region {region}")]
    NoReferenceProfile {
        /// Detector region the reflection falls on.
        region: usize,
    },

    /// A correction factor could not be computed for this geometry. The
    /// chain aborts at the failing factor; `last_good` is the estimate after
    /// the last successfully applied correction.
    #[error("degenerate geometry in correction '{correction}'")]
    DegenerateGeometry {
        /// Name of the correction that failed.
        correction: &'static str,
        /// Estimate after the last successfully applied correction.
        last_good: IntensityEstimate,
    },

    /// The preprocessor rejected the shoebox.
    #[error("rejected by preprocessor: {0}")]
    Rejected(RejectReason),

    /// The shoebox has no foreground pixels to integrate.
    #[error("shoebox has no foreground pixels")]
    EmptyForeground,
}

impl From<BackgroundError> for IntegrationFailure {
    fn from(err: BackgroundError) -> Self {
        match err {
            BackgroundError::InsufficientBackground {
                available,
                required,
            } => IntegrationFailure::InsufficientBackground {
                available,
                required,
            },
            BackgroundError::NonConvergent { iterations } => {
                IntegrationFailure::NonConvergent { iterations }
            }
        }
    }
}

impl From<GraphError> for IntegrationFailure {
    fn from(_: GraphError) -> Self {
        IntegrationFailure::InvalidRegion
    }
}

impl From<RejectReason> for IntegrationFailure {
    fn from(reason: RejectReason) -> Self {
        IntegrationFailure::Rejected(reason)
    }
}

/// Hard failure of the whole integration run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The batch contained no reflections at all.
    #[error("no reflections to integrate")]
    EmptyBatch,
}
