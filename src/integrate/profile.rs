//! Reciprocal-space profile fitting.
//!
//! Strong reflections are accumulated per detector region into normalized
//! reference profiles on a fixed grid; weak reflections are then fitted by
//! scaling the matching reference profile to their observed foreground.
//! The pool is built once per batch, before any fitting, and is immutable
//! afterwards.

use std::collections::HashMap;

use ndarray::Array3;

use crate::error::IntegrationFailure;
use crate::geometry::ReflectionGeometry;
use crate::integrate::{IntegrationStrategy, IntensityEstimate};
use crate::pixels::shoebox::{MaskCode, Shoebox};

/// Normalized mean spot shape for one detector region.
///
/// Grid values are non-negative and sum to one.
#[derive(Debug, Clone)]
pub struct ReferenceProfile {
    grid: Array3<f64>,
}

impl ReferenceProfile {
    /// Profile value at a grid bin.
    pub fn value(&self, bin: (usize, usize, usize)) -> f64 {
        self.grid[[bin.0, bin.1, bin.2]]
    }

    /// Grid dimension per axis.
    pub fn grid_size(&self) -> usize {
        self.grid.dim().0
    }
}

/// Intensity-weighted foreground centroid of a shoebox, in local pixel
/// coordinates. Falls back to the unweighted centroid when the foreground
/// carries no positive signal.
fn foreground_centroid(shoebox: &Shoebox) -> Option<(f64, f64, f64)> {
    let mut weighted = (0.0, 0.0, 0.0);
    let mut weight_sum = 0.0;
    let mut unweighted = (0.0, 0.0, 0.0);
    let mut count = 0usize;
    for ((frame, row, col), &code) in shoebox.mask.indexed_iter() {
        if code != MaskCode::Foreground {
            continue;
        }
        let weight = shoebox.data[[frame, row, col]].max(0.0);
        weighted.0 += weight * frame as f64;
        weighted.1 += weight * row as f64;
        weighted.2 += weight * col as f64;
        weight_sum += weight;
        unweighted.0 += frame as f64;
        unweighted.1 += row as f64;
        unweighted.2 += col as f64;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    if weight_sum > f64::EPSILON {
        Some((
            weighted.0 / weight_sum,
            weighted.1 / weight_sum,
            weighted.2 / weight_sum,
        ))
    } else {
        let n = count as f64;
        Some((unweighted.0 / n, unweighted.1 / n, unweighted.2 / n))
    }
}

/// Map one local pixel coordinate onto the profile grid.
///
/// Each axis is scaled by the shoebox half-extent so spots of different
/// sizes land on the same grid; the centroid maps to the grid center.
fn grid_bin(
    pixel: (usize, usize, usize),
    centroid: (f64, f64, f64),
    shape: (usize, usize, usize),
    grid_size: usize,
) -> (usize, usize, usize) {
    let map_axis = |coord: usize, center: f64, extent: usize| -> usize {
        let half = ((extent / 2).max(1)) as f64;
        let offset = (coord as f64 - center) / half;
        let bin = ((offset + 1.0) / 2.0 * (grid_size - 1) as f64).round();
        bin.clamp(0.0, (grid_size - 1) as f64) as usize
    };
    (
        map_axis(pixel.0, centroid.0, shape.0),
        map_axis(pixel.1, centroid.1, shape.1),
        map_axis(pixel.2, centroid.2, shape.2),
    )
}

/// Per-region reference profiles learned from strong reflections.
#[derive(Debug, Clone)]
pub struct ReferenceProfilePool {
    profiles: HashMap<usize, ReferenceProfile>,
    grid_size: usize,
}

impl ReferenceProfilePool {
    /// Empty pool; every lookup misses.
    pub fn empty(grid_size: usize) -> Self {
        Self {
            profiles: HashMap::new(),
            grid_size,
        }
    }

    /// Build the pool from strong reflections.
    ///
    /// Each `(shoebox, region)` pair contributes its positive foreground
    /// signal, recentered on its centroid and rescaled to the grid. Regions
    /// with fewer than `min_contributors` strong reflections, or no
    /// accumulated signal, get no profile.
    pub fn build<'a, I>(grid_size: usize, min_contributors: usize, strong: I) -> Self
    where
        I: IntoIterator<Item = (&'a Shoebox, usize)>,
    {
        let mut accumulators: HashMap<usize, (Array3<f64>, usize)> = HashMap::new();

        for (shoebox, region) in strong {
            let Some(centroid) = foreground_centroid(shoebox) else {
                continue;
            };
            let shape = shoebox.shape();
            let (grid, contributors) = accumulators.entry(region).or_insert_with(|| {
                (Array3::zeros((grid_size, grid_size, grid_size)), 0)
            });
            for (key, &code) in shoebox.mask.indexed_iter() {
                if code != MaskCode::Foreground {
                    continue;
                }
                let weight = shoebox.data[key].max(0.0);
                if weight <= 0.0 {
                    continue;
                }
                let bin = grid_bin(key, centroid, shape, grid_size);
                grid[[bin.0, bin.1, bin.2]] += weight;
            }
            *contributors += 1;
        }

        let mut profiles = HashMap::new();
        for (region, (grid, contributors)) in accumulators {
            if contributors < min_contributors {
                log::debug!(
                    "region {region}: {contributors} strong reflections, \
                     below the {min_contributors} needed for a profile"
                );
                continue;
            }
            let total: f64 = grid.sum();
            if total <= f64::EPSILON {
                continue;
            }
            profiles.insert(
                region,
                ReferenceProfile {
                    grid: grid / total,
                },
            );
        }

        log::debug!("reference pool covers {} region(s)", profiles.len());
        Self {
            profiles,
            grid_size,
        }
    }

    /// Profile for a detector region, if one was learned.
    pub fn profile(&self, region: usize) -> Option<&ReferenceProfile> {
        self.profiles.get(&region)
    }

    /// Number of regions with a learned profile.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no region has a profile.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Profile-fitting strategy: least-squares scale of the region's reference
/// profile against the observed foreground.
///
/// The scale `c` minimizes Σ (d - c·p)² / σ² over foreground pixels, giving
/// c = Σ(p·d/σ²) / Σ(p²/σ²) with variance 1 / Σ(p²/σ²).
#[derive(Debug, Clone, Copy)]
pub struct ProfileFittingReciprocalSpace<'a> {
    pool: &'a ReferenceProfilePool,
}

impl<'a> ProfileFittingReciprocalSpace<'a> {
    /// Strategy over a built reference pool.
    pub fn new(pool: &'a ReferenceProfilePool) -> Self {
        Self { pool }
    }
}

impl IntegrationStrategy for ProfileFittingReciprocalSpace<'_> {
    fn name(&self) -> &'static str {
        "profile-fitting"
    }

    fn integrate(
        &self,
        shoebox: &Shoebox,
        geometry: &ReflectionGeometry,
    ) -> Result<IntensityEstimate, IntegrationFailure> {
        if !shoebox.is_consistent() {
            return Err(IntegrationFailure::InvalidRegion);
        }
        let profile = self
            .pool
            .profile(geometry.region)
            .ok_or(IntegrationFailure::NoReferenceProfile {
                region: geometry.region,
            })?;
        let centroid =
            foreground_centroid(shoebox).ok_or(IntegrationFailure::EmptyForeground)?;
        let shape = shoebox.shape();

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (key, &code) in shoebox.mask.indexed_iter() {
            if code != MaskCode::Foreground {
                continue;
            }
            let bin = grid_bin(key, centroid, shape, self.pool.grid_size);
            let p = profile.value(bin);
            let sigma_sq = shoebox.variance[key].max(1.0);
            numerator += p * shoebox.data[key] / sigma_sq;
            denominator += p * p / sigma_sq;
        }

        if denominator <= f64::EPSILON {
            // The observed foreground never overlaps the profile's support.
            return Err(IntegrationFailure::NoReferenceProfile {
                region: geometry.region,
            });
        }

        Ok(IntensityEstimate::new(
            numerator / denominator,
            1.0 / denominator,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::aabb::Aabb;
    use approx::assert_relative_eq;

    /// Shoebox with a centered gaussian-ish blob of total `intensity`
    /// marked as foreground, everything else background.
    fn blob_shoebox(rows: usize, cols: usize, intensity: f64) -> Shoebox {
        let mut shoebox = Shoebox::new(Aabb::single_frame(0, 0, rows - 1, cols - 1));
        let center_row = (rows - 1) as f64 / 2.0;
        let center_col = (cols - 1) as f64 / 2.0;
        let mut total = 0.0;
        for ((_, row, col), value) in shoebox.data.indexed_iter_mut() {
            let dr = row as f64 - center_row;
            let dc = col as f64 - center_col;
            *value = (-(dr * dr + dc * dc) / 2.0).exp();
            total += *value;
        }
        shoebox.data.mapv_inplace(|v| v * intensity / total);
        shoebox.mask.fill(MaskCode::Foreground);
        shoebox.variance.fill(1.0);
        shoebox
    }

    fn geometry_in_region(region: usize) -> ReflectionGeometry {
        ReflectionGeometry {
            region,
            ..ReflectionGeometry::default()
        }
    }

    #[test]
    fn test_pool_learns_normalized_profile() {
        let strong = blob_shoebox(7, 7, 1000.0);
        let pool = ReferenceProfilePool::build(9, 1, [(&strong, 0usize)]);
        let profile = pool.profile(0).expect("region 0 should have a profile");
        let total: f64 = (0..9)
            .flat_map(|f| (0..9).flat_map(move |r| (0..9).map(move |c| (f, r, c))))
            .map(|bin| profile.value(bin))
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pool_respects_min_contributors() {
        let strong = blob_shoebox(7, 7, 1000.0);
        let pool = ReferenceProfilePool::build(9, 2, [(&strong, 0usize)]);
        assert!(pool.profile(0).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_fit_recovers_scaled_copy() {
        // Learn from a bright blob, fit a same-shape blob at 1/10 the
        // intensity; the fitted value should track the true total closely.
        let strong = blob_shoebox(7, 7, 1000.0);
        let pool = ReferenceProfilePool::build(9, 1, [(&strong, 0usize)]);
        let weak = blob_shoebox(7, 7, 100.0);

        let estimate = ProfileFittingReciprocalSpace::new(&pool)
            .integrate(&weak, &geometry_in_region(0))
            .unwrap();
        assert_relative_eq!(estimate.value, 100.0, max_relative = 0.05);
        assert!(estimate.variance > 0.0);
    }

    #[test]
    fn test_missing_region_fails_with_region_id() {
        let strong = blob_shoebox(7, 7, 1000.0);
        let pool = ReferenceProfilePool::build(9, 1, [(&strong, 0usize)]);
        let weak = blob_shoebox(7, 7, 100.0);

        let result = ProfileFittingReciprocalSpace::new(&pool)
            .integrate(&weak, &geometry_in_region(3));
        assert_eq!(
            result,
            Err(IntegrationFailure::NoReferenceProfile { region: 3 })
        );
    }

    #[test]
    fn test_empty_pool_misses_everywhere() {
        let pool = ReferenceProfilePool::empty(9);
        let weak = blob_shoebox(7, 7, 100.0);
        let result = ProfileFittingReciprocalSpace::new(&pool)
            .integrate(&weak, &geometry_in_region(0));
        assert!(matches!(
            result,
            Err(IntegrationFailure::NoReferenceProfile { .. })
        ));
    }

    #[test]
    fn test_empty_foreground_fails() {
        let strong = blob_shoebox(7, 7, 1000.0);
        let pool = ReferenceProfilePool::build(9, 1, [(&strong, 0usize)]);
        let empty = Shoebox::new(Aabb::single_frame(0, 0, 4, 4));
        let result = ProfileFittingReciprocalSpace::new(&pool)
            .integrate(&empty, &geometry_in_region(0));
        assert_eq!(result, Err(IntegrationFailure::EmptyForeground));
    }
}
