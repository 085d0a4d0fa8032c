//! Configuration for spot finding and reflection integration.

use serde::{Deserialize, Serialize};

use crate::background::BackgroundModel;
use crate::integrate::corrections::Correction;
use crate::pixels::graph::Connectivity;

/// Spot finding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotFinderConfig {
    /// Intensity threshold; pixels at or above it are foreground.
    pub threshold: f64,
    /// Neighborhood rule for grouping foreground pixels.
    pub connectivity: Connectivity,
    /// Rows/columns of background border added around each component's
    /// bounding box.
    pub shoebox_padding: usize,
}

impl Default for SpotFinderConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            connectivity: Connectivity::Face,
            shoebox_padding: 3,
        }
    }
}

/// Background estimation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Background model to fit.
    pub model: BackgroundModel,
    /// Minimum background pixels required for a fit.
    pub min_background_pixels: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            model: BackgroundModel::Robust {
                max_iterations: 10,
                sigma_cutoff: 3.0,
            },
            min_background_pixels: 10,
        }
    }
}

/// Preprocessor validation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Minimum usable pixels a shoebox must keep after trimming and gap
    /// masking.
    pub min_valid_pixels: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_valid_pixels: 12,
        }
    }
}

/// Which integration strategy the run uses; selected once per batch and
/// applied uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Foreground summation; the deterministic baseline.
    Summation,
    /// Reciprocal-space profile fitting; fails where no reference profile
    /// exists.
    ProfileFitting,
    /// Profile fitting with summation as the explicit fallback for profile
    /// failures.
    ProfileFittingWithSummationFallback,
}

/// Reference profile pool parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profile grid size per axis (odd, so the centroid sits on a bin).
    pub grid_size: usize,
    /// Minimum strong reflections a region needs before it gets a profile.
    pub min_contributors: usize,
    /// Minimum summation signal-to-noise for a reflection to count as
    /// strong and contribute to the pool.
    pub strong_min_signal: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            grid_size: 9,
            min_contributors: 1,
            strong_min_signal: 3.0,
        }
    }
}

/// Full configuration for one integration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Background estimation settings.
    pub background: BackgroundConfig,
    /// Preprocessor settings.
    pub preprocess: PreprocessConfig,
    /// Strategy applied to every reflection in the run.
    pub strategy: StrategyKind,
    /// Reference profile pool settings (unused for pure summation).
    pub profile: ProfileConfig,
    /// Correction factors, applied strictly in this order.
    pub corrections: Vec<Correction>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            background: BackgroundConfig::default(),
            preprocess: PreprocessConfig::default(),
            strategy: StrategyKind::Summation,
            profile: ProfileConfig::default(),
            corrections: vec![
                Correction::LorentzPolarization,
                Correction::DetectorEfficiency {
                    quantum_efficiency: 0.9,
                },
            ],
        }
    }
}
