//! Reflection and detector geometry consumed by the integration pipeline.
//!
//! The crate does not own experiment metadata models; collaborators hand in
//! the few quantities the correction chain and profile fitting need, reduced
//! to per-reflection scalars plus the detector's active-area description.

use serde::{Deserialize, Serialize};

/// Geometry of one predicted reflection.
///
/// Carries the scalars the correction chain and reciprocal-space profile
/// fitting need; everything is precomputed by the prediction layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReflectionGeometry {
    /// Scattering angle 2θ in radians.
    pub two_theta: f64,
    /// Azimuthal angle of the diffracted beam around the incident beam, radians.
    pub azimuth: f64,
    /// Goniometer rotation speed in radians per frame.
    pub rotation_speed: f64,
    /// Polarization fraction of the incident beam, in \[0, 1\].
    pub polarization_fraction: f64,
    /// Angle of incidence onto the detector surface in radians (0 = normal).
    pub incidence_angle: f64,
    /// Detector region the reflection falls on; key into the reference
    /// profile pool.
    pub region: usize,
}

impl Default for ReflectionGeometry {
    fn default() -> Self {
        Self {
            two_theta: 0.5,
            azimuth: 0.0,
            rotation_speed: 0.01,
            polarization_fraction: 0.5,
            incidence_angle: 0.0,
            region: 0,
        }
    }
}

/// Active area of the detector, with inter-panel gaps.
///
/// Gap ranges are inclusive pixel ranges in detector coordinates. Pixels in
/// a gap or outside `rows`×`cols` are unusable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorBounds {
    /// Detector height in pixels.
    pub rows: usize,
    /// Detector width in pixels.
    pub cols: usize,
    /// Inclusive row ranges covered by inter-panel gaps.
    pub gap_rows: Vec<(usize, usize)>,
    /// Inclusive column ranges covered by inter-panel gaps.
    pub gap_cols: Vec<(usize, usize)>,
}

impl DetectorBounds {
    /// Gap-free detector of the given size.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            gap_rows: Vec::new(),
            gap_cols: Vec::new(),
        }
    }

    /// Whether the pixel at (row, col) lies on the active detector area.
    pub fn is_active(&self, row: usize, col: usize) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        let in_gap = |ranges: &[(usize, usize)], v: usize| {
            ranges.iter().any(|&(lo, hi)| v >= lo && v <= hi)
        };
        !in_gap(&self.gap_rows, row) && !in_gap(&self.gap_cols, col)
    }
}
