//! Logistic suitability regression
//!
//! A cell's propensity to urbanize is a logistic function of its distances
//! to each proximity category. The coefficient is computed once per cell at
//! grid construction and never changes afterward.

use crate::core::config::SimulationConfig;
use crate::core::types::ProximityDistances;

/// Intercept, per-category weights and distance scale of the regression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionConstants {
    pub intercept: f64,
    pub weights: ProximityDistances,
    pub scale: f64,
}

impl RegressionConstants {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            intercept: config.intercept,
            weights: config.category_weights(),
            scale: config.distance_scale,
        }
    }
}

/// Linear predictor `z = b0 + scale * sum(w_k * d_k)`
///
/// `NaN` distances (category without features) are replaced by `fallback`.
pub fn linear_predictor(
    distances: &ProximityDistances,
    constants: &RegressionConstants,
    fallback: f64,
) -> f64 {
    let weighted: f64 = distances
        .iter()
        .zip(constants.weights.iter())
        .map(|(&d, &w)| w * if d.is_nan() { fallback } else { d })
        .sum();
    constants.intercept + constants.scale * weighted
}

/// Standard logistic `e^z / (1 + e^z)`, evaluated without overflow
#[inline]
pub fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Suitability coefficient in `[0, 1]` for a distance vector
///
/// Pure: identical inputs always produce a bit-identical result.
pub fn suitability(
    distances: &ProximityDistances,
    constants: &RegressionConstants,
    fallback: f64,
) -> f64 {
    logistic(linear_predictor(distances, constants, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ProximityCategory;

    fn constants() -> RegressionConstants {
        RegressionConstants::from_config(&SimulationConfig::default())
    }

    #[test]
    fn test_logistic_midpoint_and_tails() {
        assert_eq!(logistic(0.0), 0.5);
        assert!(logistic(800.0) <= 1.0);
        assert!(logistic(-800.0) >= 0.0);
        assert!(!logistic(-800.0).is_nan());
        assert!((logistic(2.0) - 2f64.exp() / (1.0 + 2f64.exp())).abs() < 1e-15);
    }

    #[test]
    fn test_zero_distances_give_intercept() {
        let c = constants();
        let s = suitability(&[0.0; ProximityCategory::COUNT], &c, 1000.0);
        let expected = 0.98f64.exp() / (1.0 + 0.98f64.exp());
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn test_nan_uses_fallback() {
        let c = constants();
        let mut with_nan = [1.0; ProximityCategory::COUNT];
        with_nan[ProximityCategory::Subways.index()] = f64::NAN;
        let mut explicit = with_nan;
        explicit[ProximityCategory::Subways.index()] = 5.0;

        let a = suitability(&with_nan, &c, 5.0);
        let b = suitability(&explicit, &c, 5.0);
        assert!(a.is_finite());
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_scale_applies_to_weighted_sum() {
        let mut c = constants();
        c.scale = 0.0;
        let s = suitability(&[1234.0; ProximityCategory::COUNT], &c, 0.0);
        assert_eq!(s, logistic(c.intercept));
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let c = constants();
        let d = [12.5, 300.0, 41.0, f64::NAN, 900.0, 15.0, 7.0, 2.0];
        let first = suitability(&d, &c, 450.0);
        for _ in 0..10 {
            assert_eq!(suitability(&d, &c, 450.0).to_bits(), first.to_bits());
        }
    }
}
