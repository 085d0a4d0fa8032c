//! Spot finding: threshold an image and cut one shoebox per connected
//! component of bright pixels.

use ndarray::{Array2, ArrayView2};

use crate::config::SpotFinderConfig;
use crate::error::GraphError;
use crate::pixels::aabb::Aabb;
use crate::pixels::graph::extract_components_2d;
use crate::pixels::shoebox::Shoebox;

/// Binary foreground mask for pixels at or above the threshold.
pub fn threshold_mask(image: &ArrayView2<f64>, threshold: f64) -> Array2<bool> {
    image.map(|&v| v >= threshold)
}

/// Find candidate spots in a detector image.
///
/// Thresholds the image, extracts connected components of bright pixels and
/// cuts a shoebox around each: component pixels are flagged foreground, the
/// rest of the padded bounding box background. Singleton components are
/// kept; size filtering is the caller's policy.
///
/// # Errors
///
/// [`GraphError::InvalidRegion`] when the image has a zero dimension.
pub fn find_spots(
    image: &ArrayView2<f64>,
    config: &SpotFinderConfig,
) -> Result<Vec<Shoebox>, GraphError> {
    let (rows, cols) = image.dim();
    let mask = threshold_mask(image, config.threshold);
    let components = extract_components_2d(&mask.view(), config.connectivity)?;

    log::debug!(
        "spot finding: {} components above threshold {} in {rows}x{cols} image",
        components.len(),
        config.threshold
    );

    let shoeboxes = components
        .into_iter()
        .map(|component| {
            let mut bounds = Aabb::new();
            for &(row, col) in &component {
                bounds.expand_to_include(0, row, col);
            }
            let bounds = bounds.padded(config.shoebox_padding, rows, cols);
            Shoebox::from_component(image, &component, bounds)
        })
        .collect();

    Ok(shoeboxes)
}
