//! DIFFINT - diffraction-image spot finding and reflection integration.
//!
//! Takes detector images from a rotation experiment through the classic
//! pipeline: threshold and group foreground pixels into spots, cut shoeboxes
//! around them, fit and subtract the local background, integrate each
//! reflection by summation or reciprocal-space profile fitting, and apply
//! the physical correction chain.
//!
//! # Module Organization
//!
//! - [`pixels`]: masks, connected components, bounding boxes and shoeboxes
//! - [`background`]: planar and robust background estimation
//! - [`integrate`]: integration strategies, corrections and batch runs
//! - [`geometry`]: detector bounds and per-reflection diffraction geometry
//! - [`config`]: serde-backed configuration for every stage
//! - [`error`]: the failure taxonomy, per-reflection failures as values
//! - [`reflection`]: the records flowing through a batch
//! - [`stats`]: median and MAD helpers shared by the robust fits
//!
//! The entry points are [`pixels::find_spots`] for detection and
//! [`integrate::Integrator::integrate_batch`] for integration.

pub mod background;
pub mod config;
pub mod error;
pub mod geometry;
pub mod integrate;
pub mod pixels;
pub mod reflection;
pub mod stats;

pub use crate::background::{BackgroundEstimator, BackgroundModel, BackgroundPlane};
pub use crate::config::{
    BackgroundConfig, IntegrationConfig, PreprocessConfig, ProfileConfig, SpotFinderConfig,
    StrategyKind,
};
pub use crate::error::{BatchError, IntegrationFailure, RejectReason};
pub use crate::geometry::{DetectorBounds, ReflectionGeometry};
pub use crate::integrate::{Correction, IntegrationStrategy, Integrator, IntensityEstimate};
pub use crate::pixels::{find_spots, Connectivity, Shoebox};
pub use crate::reflection::{Reflection, ReflectionOutcome};
