//! Axis-aligned bounding boxes for pixel regions.
//!
//! Bounds are inclusive and span frames as well as rows and columns, so a
//! single-frame (2D) region is the `min_frame == max_frame` case.

use serde::{Deserialize, Serialize};

/// Inclusive axis-aligned bounding box over (frame, row, col) pixel indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aabb {
    /// First frame covered.
    pub min_frame: usize,
    /// First row covered.
    pub min_row: usize,
    /// First column covered.
    pub min_col: usize,
    /// Last frame covered (inclusive).
    pub max_frame: usize,
    /// Last row covered (inclusive).
    pub max_row: usize,
    /// Last column covered (inclusive).
    pub max_col: usize,
}

impl Aabb {
    /// Empty box; any `expand_to_include` call makes it valid.
    pub fn new() -> Self {
        Self {
            min_frame: usize::MAX,
            min_row: usize::MAX,
            min_col: usize::MAX,
            max_frame: 0,
            max_row: 0,
            max_col: 0,
        }
    }

    /// Box covering a single-frame region.
    pub fn single_frame(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Self {
            min_frame: 0,
            min_row,
            min_col,
            max_frame: 0,
            max_row,
            max_col,
        }
    }

    /// Whether no pixel has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min_frame > self.max_frame
            || self.min_row > self.max_row
            || self.min_col > self.max_col
    }

    /// Grow the box to include the given pixel.
    pub fn expand_to_include(&mut self, frame: usize, row: usize, col: usize) {
        self.min_frame = self.min_frame.min(frame);
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_frame = self.max_frame.max(frame);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    /// Shape of the covered block as (frames, rows, cols).
    pub fn shape(&self) -> (usize, usize, usize) {
        if self.is_empty() {
            return (0, 0, 0);
        }
        (
            self.max_frame - self.min_frame + 1,
            self.max_row - self.min_row + 1,
            self.max_col - self.min_col + 1,
        )
    }

    /// Expand rows and columns by `pad` on each side, clamped to an image of
    /// `rows`×`cols`. Frames are not padded.
    pub fn padded(&self, pad: usize, rows: usize, cols: usize) -> Self {
        let mut out = *self;
        out.min_row = self.min_row.saturating_sub(pad);
        out.min_col = self.min_col.saturating_sub(pad);
        out.max_row = (self.max_row + pad).min(rows.saturating_sub(1));
        out.max_col = (self.max_col + pad).min(cols.saturating_sub(1));
        out
    }

    /// Whether the pixel lies inside the box.
    pub fn contains(&self, frame: usize, row: usize, col: usize) -> bool {
        frame >= self.min_frame
            && frame <= self.max_frame
            && row >= self.min_row
            && row <= self.max_row
            && col >= self.min_col
            && col <= self.max_col
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_box_is_empty() {
        let bbox = Aabb::new();
        assert!(bbox.is_empty());
        assert_eq!(bbox.shape(), (0, 0, 0));
    }

    #[test]
    fn test_expand_to_include() {
        let mut bbox = Aabb::new();
        bbox.expand_to_include(0, 5, 7);
        bbox.expand_to_include(0, 2, 9);
        assert!(!bbox.is_empty());
        assert_eq!(bbox.min_row, 2);
        assert_eq!(bbox.max_row, 5);
        assert_eq!(bbox.min_col, 7);
        assert_eq!(bbox.max_col, 9);
        assert_eq!(bbox.shape(), (1, 4, 3));
    }

    #[test]
    fn test_padded_clamps_to_image() {
        let bbox = Aabb::single_frame(1, 1, 3, 3);
        let padded = bbox.padded(2, 5, 5);
        assert_eq!(padded.min_row, 0);
        assert_eq!(padded.min_col, 0);
        assert_eq!(padded.max_row, 4);
        assert_eq!(padded.max_col, 4);
    }

    #[test]
    fn test_contains() {
        let bbox = Aabb::single_frame(2, 3, 4, 6);
        assert!(bbox.contains(0, 2, 3));
        assert!(bbox.contains(0, 4, 6));
        assert!(!bbox.contains(0, 5, 4));
        assert!(!bbox.contains(1, 3, 4));
    }
}
