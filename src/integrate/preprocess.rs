//! Shoebox preprocessing: detector-area trimming, panel-gap masking and
//! minimum-size validation.

use crate::config::PreprocessConfig;
use crate::error::RejectReason;
use crate::geometry::DetectorBounds;
use crate::pixels::shoebox::{MaskCode, Shoebox};

/// Outcome of preparing one shoebox.
///
/// Rejection is a value, not an error: the orchestrator records it as that
/// reflection's failure and continues with the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessOutcome {
    /// The shoebox is usable for integration.
    Accepted,
    /// The shoebox is unusable; the reason says why.
    Rejected(RejectReason),
}

/// Validates and normalizes shoeboxes before integration.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    min_valid_pixels: usize,
}

impl Preprocessor {
    /// Preprocessor from configuration.
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            min_valid_pixels: config.min_valid_pixels,
        }
    }

    /// Trim pixels outside the active detector area, mask panel gaps, and
    /// validate that enough usable pixels remain.
    pub fn prepare(&self, shoebox: &mut Shoebox, detector: &DetectorBounds) -> PreprocessOutcome {
        let bounds = shoebox.bounds;
        for ((_, row, col), code) in shoebox.mask.indexed_iter_mut() {
            if !detector.is_active(bounds.min_row + row, bounds.min_col + col) {
                *code = MaskCode::Invalid;
            }
        }

        let valid = shoebox.valid_count();
        if valid == 0 {
            return PreprocessOutcome::Rejected(RejectReason::OutsideDetector);
        }
        if valid < self.min_valid_pixels {
            return PreprocessOutcome::Rejected(RejectReason::TooFewValidPixels {
                valid,
                required: self.min_valid_pixels,
            });
        }
        if shoebox.foreground_count() == 0 {
            return PreprocessOutcome::Rejected(RejectReason::NoForeground);
        }
        PreprocessOutcome::Accepted
    }
}
