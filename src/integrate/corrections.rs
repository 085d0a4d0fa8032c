//! Physical correction factors applied to raw intensity estimates.
//!
//! Each factor is a stateless, pure transform of (intensity, variance)
//! given the reflection geometry; the chain applies them strictly in the
//! configured order. Multiplicative corrections commute in effect but not
//! in floating-point rounding, so the order is part of the run's
//! reproducibility contract and is never reordered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::IntegrationFailure;
use crate::geometry::ReflectionGeometry;
use crate::integrate::IntensityEstimate;

/// Smallest geometric quantity treated as non-degenerate.
const DEGENERACY_EPS: f64 = 1e-9;

/// A single correction factor could not be computed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrectionError {
    /// The reflection geometry is degenerate for this factor.
    #[error("degenerate geometry for correction '{correction}'")]
    DegenerateGeometry {
        /// Name of the failing correction.
        correction: &'static str,
    },
}

/// One named, stateless correction factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Correction {
    /// Lorentz-polarization correction for rotation data.
    ///
    /// Divides the intensity by L·P with L = rotation speed / sin 2θ and P
    /// from the polarization fraction and azimuth. Degenerate at zero
    /// scattering angle or zero rotation speed.
    LorentzPolarization,

    /// Detector quantum-efficiency correction.
    ///
    /// Models the detected fraction as 1 - (1 - QE)^(1 / cos θi) for
    /// incidence angle θi and divides the intensity by it. Degenerate at
    /// grazing incidence or non-positive QE.
    DetectorEfficiency {
        /// Quantum efficiency at normal incidence, in (0, 1].
        quantum_efficiency: f64,
    },
}

impl Correction {
    /// Name used in logs and failure reports.
    pub fn name(&self) -> &'static str {
        match self {
            Correction::LorentzPolarization => "lorentz-polarization",
            Correction::DetectorEfficiency { .. } => "detector-efficiency",
        }
    }

    /// Multiplicative factor for this correction, or a degeneracy error.
    fn factor(&self, geometry: &ReflectionGeometry) -> Result<f64, CorrectionError> {
        match *self {
            Correction::LorentzPolarization => {
                let sin_two_theta = geometry.two_theta.sin();
                if sin_two_theta.abs() < DEGENERACY_EPS
                    || geometry.rotation_speed <= DEGENERACY_EPS
                {
                    return Err(CorrectionError::DegenerateGeometry {
                        correction: self.name(),
                    });
                }
                let lorentz = geometry.rotation_speed / sin_two_theta;
                let p = geometry.polarization_fraction;
                let polarization = p * (1.0 - (sin_two_theta * geometry.azimuth.cos()).powi(2))
                    + (1.0 - p) * (1.0 - (sin_two_theta * geometry.azimuth.sin()).powi(2));
                if polarization.abs() < DEGENERACY_EPS {
                    return Err(CorrectionError::DegenerateGeometry {
                        correction: self.name(),
                    });
                }
                Ok(1.0 / (lorentz * polarization))
            }
            Correction::DetectorEfficiency { quantum_efficiency } => {
                let cos_incidence = geometry.incidence_angle.cos();
                if cos_incidence < DEGENERACY_EPS
                    || quantum_efficiency <= 0.0
                    || quantum_efficiency > 1.0
                {
                    return Err(CorrectionError::DegenerateGeometry {
                        correction: self.name(),
                    });
                }
                let detected = 1.0 - (1.0 - quantum_efficiency).powf(1.0 / cos_incidence);
                if detected < DEGENERACY_EPS {
                    return Err(CorrectionError::DegenerateGeometry {
                        correction: self.name(),
                    });
                }
                Ok(1.0 / detected)
            }
        }
    }

    /// Apply this correction to an estimate.
    ///
    /// # Errors
    ///
    /// [`CorrectionError::DegenerateGeometry`] when the factor cannot be
    /// computed for this geometry.
    pub fn apply(
        &self,
        estimate: IntensityEstimate,
        geometry: &ReflectionGeometry,
    ) -> Result<IntensityEstimate, CorrectionError> {
        let factor = self.factor(geometry)?;
        Ok(IntensityEstimate::new(
            estimate.value * factor,
            estimate.variance * factor * factor,
        ))
    }
}

/// Ordered sequence of correction factors.
#[derive(Debug, Clone, Default)]
pub struct CorrectionChain {
    corrections: Vec<Correction>,
}

impl CorrectionChain {
    /// Chain applying `corrections` in the given order.
    pub fn new(corrections: Vec<Correction>) -> Self {
        Self { corrections }
    }

    /// The configured factors, in application order.
    pub fn corrections(&self) -> &[Correction] {
        &self.corrections
    }

    /// Apply every factor in order.
    ///
    /// On a degenerate factor the chain aborts there and reports the
    /// estimate after the last successful correction alongside the failing
    /// factor's name; it never substitutes a default.
    ///
    /// # Errors
    ///
    /// [`IntegrationFailure::DegenerateGeometry`] from the first factor
    /// that cannot be computed.
    pub fn apply(
        &self,
        estimate: IntensityEstimate,
        geometry: &ReflectionGeometry,
    ) -> Result<IntensityEstimate, IntegrationFailure> {
        let mut current = estimate;
        for correction in &self.corrections {
            match correction.apply(current, geometry) {
                Ok(corrected) => current = corrected,
                Err(CorrectionError::DegenerateGeometry { correction }) => {
                    return Err(IntegrationFailure::DegenerateGeometry {
                        correction,
                        last_good: current,
                    });
                }
            }
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn geometry() -> ReflectionGeometry {
        ReflectionGeometry {
            two_theta: 0.6,
            azimuth: 0.3,
            rotation_speed: 0.02,
            polarization_fraction: 0.5,
            incidence_angle: 0.2,
            region: 0,
        }
    }

    #[test]
    fn test_lp_scales_value_and_variance() {
        let estimate = IntensityEstimate::new(100.0, 25.0);
        let corrected = Correction::LorentzPolarization
            .apply(estimate, &geometry())
            .unwrap();
        let factor = corrected.value / estimate.value;
        assert!(factor > 0.0);
        assert_relative_eq!(corrected.variance, 25.0 * factor * factor, epsilon = 1e-9);
    }

    #[test]
    fn test_lp_degenerate_at_zero_scattering_angle() {
        let mut degenerate = geometry();
        degenerate.two_theta = 0.0;
        let result =
            Correction::LorentzPolarization.apply(IntensityEstimate::new(1.0, 1.0), &degenerate);
        assert_eq!(
            result,
            Err(CorrectionError::DegenerateGeometry {
                correction: "lorentz-polarization"
            })
        );
    }

    #[test]
    fn test_efficiency_normal_incidence() {
        let correction = Correction::DetectorEfficiency {
            quantum_efficiency: 0.8,
        };
        let mut normal = geometry();
        normal.incidence_angle = 0.0;
        let corrected = correction
            .apply(IntensityEstimate::new(80.0, 16.0), &normal)
            .unwrap();
        // At normal incidence the detected fraction is the QE itself.
        assert_relative_eq!(corrected.value, 100.0, epsilon = 1e-9);
        assert_relative_eq!(corrected.variance, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_efficiency_degenerate_at_grazing_incidence() {
        let correction = Correction::DetectorEfficiency {
            quantum_efficiency: 0.8,
        };
        let mut grazing = geometry();
        grazing.incidence_angle = std::f64::consts::FRAC_PI_2;
        let result = correction.apply(IntensityEstimate::new(1.0, 1.0), &grazing);
        assert!(matches!(
            result,
            Err(CorrectionError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_chain_preserves_configured_order() {
        // The two orders agree only to rounding; bit-level results differ,
        // which is exactly why the order is pinned.
        let forward = CorrectionChain::new(vec![
            Correction::LorentzPolarization,
            Correction::DetectorEfficiency {
                quantum_efficiency: 0.7,
            },
        ]);
        let reversed = CorrectionChain::new(vec![
            Correction::DetectorEfficiency {
                quantum_efficiency: 0.7,
            },
            Correction::LorentzPolarization,
        ]);

        let estimate = IntensityEstimate::new(123.456, 7.89);
        let a = forward.apply(estimate, &geometry()).unwrap();
        let b = reversed.apply(estimate, &geometry()).unwrap();

        assert_relative_eq!(a.value, b.value, max_relative = 1e-12);
        assert_eq!(
            forward.corrections()[0].name(),
            "lorentz-polarization"
        );
        assert_eq!(reversed.corrections()[0].name(), "detector-efficiency");
    }

    #[test]
    fn test_chain_aborts_with_last_good_estimate() {
        let chain = CorrectionChain::new(vec![
            Correction::DetectorEfficiency {
                quantum_efficiency: 0.8,
            },
            Correction::LorentzPolarization,
        ]);
        let mut degenerate = geometry();
        degenerate.two_theta = 0.0;
        degenerate.incidence_angle = 0.0;

        let result = chain.apply(IntensityEstimate::new(80.0, 16.0), &degenerate);
        match result {
            Err(IntegrationFailure::DegenerateGeometry {
                correction,
                last_good,
            }) => {
                assert_eq!(correction, "lorentz-polarization");
                // The efficiency correction had already been applied.
                assert_relative_eq!(last_good.value, 100.0, epsilon = 1e-9);
            }
            other => panic!("expected degenerate geometry, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = CorrectionChain::new(Vec::new());
        let estimate = IntensityEstimate::new(5.0, 2.0);
        let out = chain.apply(estimate, &geometry()).unwrap();
        assert_eq!(out, estimate);
    }
}
