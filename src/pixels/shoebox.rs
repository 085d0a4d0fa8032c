//! Shoeboxes: bounded pixel regions owned by one candidate reflection.

use ndarray::{Array3, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::pixels::aabb::Aabb;

/// Per-pixel classification within a shoebox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskCode {
    /// Pixel contributes to the background fit.
    Background,
    /// Pixel belongs to the reflection signal.
    Foreground,
    /// Pixel is unusable: detector gap, trimmed, or re-classified as a
    /// background outlier.
    Invalid,
}

/// A bounded pixel block belonging to one candidate reflection.
///
/// The shoebox exclusively owns its pixel data, mask and variance buffers,
/// which always share one shape. Background subtraction and preprocessing
/// mutate it in place; integration strategies read it only.
#[derive(Debug, Clone)]
pub struct Shoebox {
    /// Placement of the block on the detector (inclusive bounds).
    pub bounds: Aabb,
    /// Pixel values; raw counts before background subtraction, corrected
    /// signal afterwards.
    pub data: Array3<f64>,
    /// Per-pixel classification.
    pub mask: Array3<MaskCode>,
    /// Per-pixel variance, filled in by background subtraction.
    pub variance: Array3<f64>,
}

impl Shoebox {
    /// Zero-filled shoebox covering `bounds`, all pixels background.
    pub fn new(bounds: Aabb) -> Self {
        let shape = bounds.shape();
        Self {
            bounds,
            data: Array3::zeros(shape),
            mask: Array3::from_elem(shape, MaskCode::Background),
            variance: Array3::zeros(shape),
        }
    }

    /// Cut a single-frame shoebox out of an image.
    ///
    /// Pixel values are copied from the image over `bounds`; the pixels
    /// listed in `foreground` (absolute image coordinates) are flagged
    /// foreground, the rest background.
    pub fn from_component(
        image: &ArrayView2<f64>,
        foreground: &[(usize, usize)],
        bounds: Aabb,
    ) -> Self {
        let mut shoebox = Self::new(bounds);
        let (_, box_rows, box_cols) = bounds.shape();
        for r in 0..box_rows {
            for c in 0..box_cols {
                shoebox.data[[0, r, c]] = image[[bounds.min_row + r, bounds.min_col + c]];
            }
        }
        for &(row, col) in foreground {
            if bounds.contains(0, row, col) {
                shoebox.mask[[0, row - bounds.min_row, col - bounds.min_col]] =
                    MaskCode::Foreground;
            }
        }
        shoebox
    }

    /// Shape of the pixel block as (frames, rows, cols).
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Whether data, mask and variance agree in shape and are non-empty.
    pub fn is_consistent(&self) -> bool {
        let shape = self.data.dim();
        shape == self.mask.dim()
            && shape == self.variance.dim()
            && shape.0 > 0
            && shape.1 > 0
            && shape.2 > 0
    }

    /// Number of pixels carrying the given mask code.
    pub fn count(&self, code: MaskCode) -> usize {
        self.mask.iter().filter(|&&m| m == code).count()
    }

    /// Number of foreground pixels.
    pub fn foreground_count(&self) -> usize {
        self.count(MaskCode::Foreground)
    }

    /// Number of background pixels.
    pub fn background_count(&self) -> usize {
        self.count(MaskCode::Background)
    }

    /// Number of usable (non-invalid) pixels.
    pub fn valid_count(&self) -> usize {
        self.mask.len() - self.count(MaskCode::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_new_shoebox_is_consistent() {
        let shoebox = Shoebox::new(Aabb::single_frame(2, 2, 6, 8));
        assert!(shoebox.is_consistent());
        assert_eq!(shoebox.shape(), (1, 5, 7));
        assert_eq!(shoebox.background_count(), 35);
        assert_eq!(shoebox.foreground_count(), 0);
    }

    #[test]
    fn test_from_component_copies_data_and_mask() {
        let mut image = Array2::<f64>::from_elem((10, 10), 2.0);
        image[[4, 4]] = 20.0;
        image[[4, 5]] = 21.0;

        let bounds = Aabb::single_frame(3, 3, 6, 6);
        let shoebox =
            Shoebox::from_component(&image.view(), &[(4, 4), (4, 5)], bounds);

        assert_relative_eq!(shoebox.data[[0, 1, 1]], 20.0);
        assert_relative_eq!(shoebox.data[[0, 1, 2]], 21.0);
        assert_relative_eq!(shoebox.data[[0, 0, 0]], 2.0);
        assert_eq!(shoebox.mask[[0, 1, 1]], MaskCode::Foreground);
        assert_eq!(shoebox.mask[[0, 1, 2]], MaskCode::Foreground);
        assert_eq!(shoebox.mask[[0, 0, 0]], MaskCode::Background);
        assert_eq!(shoebox.foreground_count(), 2);
        assert_eq!(shoebox.background_count(), 14);
    }

    #[test]
    fn test_counts_track_mask_edits() {
        let mut shoebox = Shoebox::new(Aabb::single_frame(0, 0, 2, 2));
        shoebox.mask[[0, 1, 1]] = MaskCode::Foreground;
        shoebox.mask[[0, 0, 0]] = MaskCode::Invalid;
        assert_eq!(shoebox.foreground_count(), 1);
        assert_eq!(shoebox.background_count(), 7);
        assert_eq!(shoebox.valid_count(), 8);
    }
}
