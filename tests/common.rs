//! Common utilities for diffint integration tests

use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Parameters for one synthetic diffraction spot
#[derive(Debug, Clone)]
pub struct SpotParams {
    pub row: f64,
    pub col: f64,
    pub peak: f64,
    pub sigma: f64,
}

impl SpotParams {
    pub fn new(row: f64, col: f64, peak: f64) -> Self {
        Self {
            row,
            col,
            peak,
            sigma: 1.5,
        }
    }

    /// Total flux of the (untruncated) gaussian spot.
    pub fn total_flux(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.sigma * self.sigma * self.peak
    }
}

/// Configuration for synthetic image generation
#[derive(Debug, Clone)]
pub struct SyntheticImageConfig {
    pub rows: usize,
    pub cols: usize,
    pub background_level: f64,
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for SyntheticImageConfig {
    fn default() -> Self {
        Self {
            rows: 64,
            cols: 64,
            background_level: 50.0,
            noise_std: 2.0,
            seed: 42,
        }
    }
}

/// Render a detector image: flat background plus gaussian spots, with
/// optional seeded gaussian noise.
pub fn render_image(config: &SyntheticImageConfig, spots: &[SpotParams]) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_std.max(f64::EPSILON)).unwrap();

    let mut image = Array2::from_elem((config.rows, config.cols), config.background_level);
    for ((row, col), value) in image.indexed_iter_mut() {
        if config.noise_std > 0.0 {
            *value += noise.sample(&mut rng);
        }
        for spot in spots {
            let dr = row as f64 - spot.row;
            let dc = col as f64 - spot.col;
            *value += spot.peak * (-(dr * dr + dc * dc) / (2.0 * spot.sigma * spot.sigma)).exp();
        }
    }
    image
}

/// Render a noiseless image with a flat square spot, the simplest fully
/// predictable input: `size` x `size` pixels of `background + signal`.
pub fn render_square_spot(
    rows: usize,
    cols: usize,
    background: f64,
    top: usize,
    left: usize,
    size: usize,
    signal: f64,
) -> Array2<f64> {
    let mut image = Array2::from_elem((rows, cols), background);
    for row in top..top + size {
        for col in left..left + size {
            image[[row, col]] += signal;
        }
    }
    image
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
