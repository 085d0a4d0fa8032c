//! Pixel-level building blocks: bounding boxes, connectivity analysis,
//! shoeboxes and the spot-finding front end.
//!
//! # Module Organization
//!
//! - **aabb**: inclusive bounding boxes over (frame, row, col) indices
//! - **graph**: connected-component extraction over foreground masks
//! - **shoebox**: per-reflection pixel blocks with data/mask/variance
//! - **spotfind**: threshold → components → shoeboxes bridge

pub mod aabb;
pub mod graph;
pub mod shoebox;
pub mod spotfind;

pub use aabb::Aabb;
pub use graph::{
    extract_components, extract_components_2d, extract_components_bfs, label_components,
    Connectivity, PixelKey,
};
pub use shoebox::{MaskCode, Shoebox};
pub use spotfind::{find_spots, threshold_mask};
