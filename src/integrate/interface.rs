//! Batch orchestration: preprocess, background, profile pool, strategy
//! dispatch and corrections for a whole set of reflections.
//!
//! Execution runs in three phases. Phase one prepares every shoebox in
//! parallel (validation, detector trimming, background subtraction) and
//! records per-reflection failures as values. Phase two builds the
//! reference profile pool from the strong survivors, a serial step because
//! every region's profile must see every contributor. Phase three
//! integrates and corrects in parallel over the now-immutable shoeboxes.
//! One reflection's failure never aborts the batch; outcomes come back in
//! input order.

use rayon::prelude::*;

use crate::background::BackgroundEstimator;
use crate::config::{IntegrationConfig, StrategyKind};
use crate::error::{BatchError, IntegrationFailure};
use crate::geometry::DetectorBounds;
use crate::integrate::corrections::CorrectionChain;
use crate::integrate::preprocess::{PreprocessOutcome, Preprocessor};
use crate::integrate::profile::{ProfileFittingReciprocalSpace, ReferenceProfilePool};
use crate::integrate::summation::Summation;
use crate::integrate::{FallbackStrategy, IntegrationStrategy};
use crate::reflection::{Reflection, ReflectionOutcome};

/// Runs the full integration pipeline over batches of reflections.
#[derive(Debug, Clone)]
pub struct Integrator {
    config: IntegrationConfig,
    detector: DetectorBounds,
}

impl Integrator {
    /// Integrator for one detector and configuration.
    pub fn new(config: IntegrationConfig, detector: DetectorBounds) -> Self {
        Self { config, detector }
    }

    /// Integrate a batch of reflections.
    ///
    /// Shoeboxes are mutated in place by preprocessing and background
    /// subtraction. The returned outcomes are in input order, one per
    /// reflection, with failures embedded as values.
    ///
    /// # Errors
    ///
    /// [`BatchError::EmptyBatch`] for an empty input slice. Everything else
    /// is per-reflection and lands in the outcomes.
    pub fn integrate_batch(
        &self,
        reflections: &mut [Reflection],
    ) -> Result<Vec<ReflectionOutcome>, BatchError> {
        if reflections.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let preprocessor = Preprocessor::new(&self.config.preprocess);
        let estimator = BackgroundEstimator::new(&self.config.background);

        let prepared: Vec<Option<IntegrationFailure>> = reflections
            .par_iter_mut()
            .map(|reflection| self.prepare_one(reflection, &preprocessor, &estimator))
            .collect();

        let pool = match self.config.strategy {
            StrategyKind::Summation => {
                ReferenceProfilePool::empty(self.config.profile.grid_size)
            }
            StrategyKind::ProfileFitting
            | StrategyKind::ProfileFittingWithSummationFallback => {
                self.build_pool(reflections, &prepared)
            }
        };

        let summation = Summation;
        let profile;
        let fallback;
        let strategy: &dyn IntegrationStrategy = match self.config.strategy {
            StrategyKind::Summation => &summation,
            StrategyKind::ProfileFitting => {
                profile = ProfileFittingReciprocalSpace::new(&pool);
                &profile
            }
            StrategyKind::ProfileFittingWithSummationFallback => {
                fallback =
                    FallbackStrategy::new(ProfileFittingReciprocalSpace::new(&pool), Summation);
                &fallback
            }
        };
        let chain = CorrectionChain::new(self.config.corrections.clone());

        let outcomes: Vec<ReflectionOutcome> = reflections
            .par_iter()
            .zip(prepared.par_iter())
            .map(|(reflection, failure)| {
                let result = match failure {
                    Some(failure) => Err(failure.clone()),
                    None => strategy
                        .integrate(&reflection.shoebox, &reflection.geometry)
                        .and_then(|raw| chain.apply(raw, &reflection.geometry)),
                };
                ReflectionOutcome {
                    id: reflection.id,
                    result,
                }
            })
            .collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        log::info!(
            "integrated {succeeded}/{} reflections with {}",
            outcomes.len(),
            strategy.name()
        );
        Ok(outcomes)
    }

    /// Validate, trim and background-subtract one shoebox, returning its
    /// failure if any step disqualifies it.
    fn prepare_one(
        &self,
        reflection: &mut Reflection,
        preprocessor: &Preprocessor,
        estimator: &BackgroundEstimator,
    ) -> Option<IntegrationFailure> {
        if !reflection.shoebox.is_consistent() {
            return Some(IntegrationFailure::InvalidRegion);
        }
        if let PreprocessOutcome::Rejected(reason) =
            preprocessor.prepare(&mut reflection.shoebox, &self.detector)
        {
            log::debug!("reflection {}: rejected ({reason})", reflection.id);
            return Some(reason.into());
        }
        if let Err(err) = estimator.estimate_and_subtract(&mut reflection.shoebox) {
            log::debug!("reflection {}: background failed ({err})", reflection.id);
            return Some(err.into());
        }
        None
    }

    /// Build the reference pool from prepared reflections whose summation
    /// signal-to-noise clears the strong threshold.
    fn build_pool(
        &self,
        reflections: &[Reflection],
        prepared: &[Option<IntegrationFailure>],
    ) -> ReferenceProfilePool {
        let threshold = self.config.profile.strong_min_signal;
        let strong = reflections
            .iter()
            .zip(prepared)
            .filter(|(_, failure)| failure.is_none())
            .filter_map(|(reflection, _)| {
                let estimate = Summation
                    .integrate(&reflection.shoebox, &reflection.geometry)
                    .ok()?;
                (estimate.signal_to_noise() >= threshold)
                    .then_some((&reflection.shoebox, reflection.geometry.region))
            });
        ReferenceProfilePool::build(
            self.config.profile.grid_size,
            self.config.profile.min_contributors,
            strong,
        )
    }
}
