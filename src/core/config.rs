//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose
//! and how they interact with each other. A config value is immutable once it
//! is handed to grid construction; every component reads the same bundle.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{GrowthError, Result};
use crate::core::types::{ProximityCategory, ProximityDistances};

/// Configuration for grid construction and the growth iterations
///
/// Lengths are meters and areas are square meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === GRID ===
    /// Edge length of one square cell
    pub cell_size: f64,

    /// Side length `m` of the square window used for neighborhood density
    ///
    /// Must be odd so the window is centered on the cell. At 3 the window
    /// covers the 8 immediate neighbors.
    pub neighborhood_size: usize,

    /// Minimum grid cell count before construction runs across threads
    ///
    /// Below this threshold, thread overhead exceeds the benefit of
    /// computing distances in parallel.
    pub parallel_threshold: usize,

    // === SUITABILITY REGRESSION ===
    /// Multiplier applied to the weighted distance sum before the intercept is added
    pub distance_scale: f64,

    /// Regression intercept b0
    pub intercept: f64,

    /// Weight for distance to ordinary roads (bRD)
    pub weight_roads: f64,

    /// Weight for distance to express roads (bHW)
    pub weight_express_roads: f64,

    /// Weight for distance to railways (bRW)
    pub weight_railways: f64,

    /// Weight for distance to subways (bSW)
    pub weight_subways: f64,

    /// Weight for distance to main centers (bMC)
    pub weight_main_centers: f64,

    /// Weight for distance to district centers (bDC)
    pub weight_district_centers: f64,

    /// Weight for distance to large town centers (bLTC)
    pub weight_large_town_centers: f64,

    /// Weight for distance to small town centers (bSTC)
    pub weight_small_town_centers: f64,

    // === FEATURE CLASSIFICATION ===
    /// Roads with `maxspeed` at or above this value are express roads
    pub min_expressway_speed: f64,

    /// River width used when a waterway carries no `width` attribute
    pub default_river_width: f64,

    // === INITIAL LAND-USE CLASSIFICATION ===
    /// Radius scanned for buildings, land use and footways around a centroid
    pub scanning_radius: f64,

    /// Total score at which a cell starts out urban
    pub threshold_score: u32,

    /// Points of interest that must lie within one cell width to score
    pub point_threshold: usize,

    /// Score for a dense point-of-interest cluster
    pub point_score: u32,

    /// Score for a pedestrian path within scanning range
    pub footway_score: u32,

    /// Score for lying inside commercial land use; lower tiers score less
    pub max_landuse_score: u32,

    /// Ceiling on the area any single building contributes
    ///
    /// Keeps one warehouse from counting as a dense block.
    pub building_area_cap: f64,

    /// Summed building area for the medium bonus
    pub medium_building_area: f64,

    /// Summed building area for the large bonus
    pub large_building_area: f64,

    /// Score when summed area reaches `medium_building_area`
    pub medium_building_score: u32,

    /// Score when summed area reaches `large_building_area`
    pub large_building_score: u32,

    /// Number of nearest buildings examined around a centroid
    pub building_window: usize,

    /// Flat bonus when every building in the window lies within scanning range
    pub building_window_score: u32,

    // === ITERATION ===
    /// Degree of perturbation `p` in `RA = 1 + (-ln r)^p`
    ///
    /// At 1 the resistance is exponentially distributed; larger values
    /// sharpen its variance.
    pub perturbation_degree: f64,

    /// Segmentation degree `s`: seed markers = `(width * height)^s`
    ///
    /// Higher values mean more, smaller segments.
    pub segmentation_degree: f64,

    /// Weight w1 of mean development probability in segment utility
    pub utility_weight_mean: f64,

    /// Weight w2 of development probability spread in segment utility
    pub utility_weight_stddev: f64,

    /// Mean local urban density above which a segment grows organically
    pub organic_threshold: f64,

    /// Radius (in cells) of the density window used to pick the growth regime
    pub lei_radius: usize,

    /// Suitability below which a spontaneous seed is considered exhausted
    pub spontaneous_suitability_floor: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cell_size: 40.0,
            neighborhood_size: 3,
            parallel_threshold: 4096,

            distance_scale: 1.0,
            intercept: 0.98,
            weight_roads: -0.35,
            weight_express_roads: 0.62,
            weight_railways: -0.81,
            weight_subways: -0.74,
            weight_main_centers: -0.37,
            weight_district_centers: 0.05,
            weight_large_town_centers: 0.04,
            weight_small_town_centers: -0.21,

            min_expressway_speed: 61.0,
            default_river_width: 60.0,

            scanning_radius: 240.0,
            threshold_score: 7,
            point_threshold: 5,
            point_score: 2,
            footway_score: 1,
            max_landuse_score: 4,
            building_area_cap: 700.0,
            medium_building_area: 2800.0,
            large_building_area: 4200.0,
            medium_building_score: 3,
            large_building_score: 4,
            building_window: 7,
            building_window_score: 2,

            perturbation_degree: 1.0,
            segmentation_degree: 0.7,
            utility_weight_mean: 0.5,
            utility_weight_stddev: 0.5,
            organic_threshold: 0.5,
            lei_radius: 3,
            spontaneous_suitability_floor: 0.05,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Regression weights ordered like [`ProximityCategory::ALL`]
    pub fn category_weights(&self) -> ProximityDistances {
        let mut weights = [0.0; ProximityCategory::COUNT];
        for category in ProximityCategory::ALL {
            weights[category.index()] = self.category_weight(category);
        }
        weights
    }

    /// Regression weight for one proximity category
    pub fn category_weight(&self, category: ProximityCategory) -> f64 {
        match category {
            ProximityCategory::Roads => self.weight_roads,
            ProximityCategory::ExpressRoads => self.weight_express_roads,
            ProximityCategory::Railways => self.weight_railways,
            ProximityCategory::Subways => self.weight_subways,
            ProximityCategory::MainCenters => self.weight_main_centers,
            ProximityCategory::DistrictCenters => self.weight_district_centers,
            ProximityCategory::LargeTownCenters => self.weight_large_town_centers,
            ProximityCategory::SmallTownCenters => self.weight_small_town_centers,
        }
    }

    /// Validate every parameter against its documented range
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        positive("cell_size", self.cell_size)?;

        if self.neighborhood_size <= 1 || self.neighborhood_size % 2 == 0 {
            return Err(GrowthError::invalid(
                "neighborhood_size",
                format!("must be odd and greater than 1, got {}", self.neighborhood_size),
            ));
        }

        positive("perturbation_degree", self.perturbation_degree)?;

        if !(self.segmentation_degree > 0.2 && self.segmentation_degree < 0.9) {
            return Err(GrowthError::invalid(
                "segmentation_degree",
                format!("must lie in (0.2, 0.9), got {}", self.segmentation_degree),
            ));
        }

        finite("distance_scale", self.distance_scale)?;
        finite("intercept", self.intercept)?;
        for category in ProximityCategory::ALL {
            if !self.category_weight(category).is_finite() {
                return Err(GrowthError::invalid(
                    "category weight",
                    format!("for {:?} must be finite", category),
                ));
            }
        }

        if !(self.min_expressway_speed.is_finite() && self.min_expressway_speed >= 0.0) {
            return Err(GrowthError::invalid(
                "min_expressway_speed",
                format!("must be finite and non-negative, got {}", self.min_expressway_speed),
            ));
        }
        positive("default_river_width", self.default_river_width)?;
        positive("scanning_radius", self.scanning_radius)?;

        if self.point_threshold == 0 {
            return Err(GrowthError::invalid("point_threshold", "must be at least 1"));
        }
        if self.building_window == 0 {
            return Err(GrowthError::invalid("building_window", "must be at least 1"));
        }
        positive("building_area_cap", self.building_area_cap)?;
        positive("medium_building_area", self.medium_building_area)?;
        positive("large_building_area", self.large_building_area)?;
        if self.medium_building_area > self.large_building_area {
            return Err(GrowthError::invalid(
                "medium_building_area",
                format!(
                    "({}) must not exceed large_building_area ({})",
                    self.medium_building_area, self.large_building_area
                ),
            ));
        }

        finite("utility_weight_mean", self.utility_weight_mean)?;
        finite("utility_weight_stddev", self.utility_weight_stddev)?;
        unit_interval("organic_threshold", self.organic_threshold)?;
        if self.lei_radius == 0 {
            return Err(GrowthError::invalid("lei_radius", "must be at least 1"));
        }
        unit_interval(
            "spontaneous_suitability_floor",
            self.spontaneous_suitability_floor,
        )?;

        Ok(())
    }
}

fn finite(parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GrowthError::invalid(parameter, format!("must be finite, got {}", value)))
    }
}

fn positive(parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GrowthError::invalid(
            parameter,
            format!("must be finite and positive, got {}", value),
        ))
    }
}

fn unit_interval(parameter: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GrowthError::invalid(
            parameter,
            format!("must lie in [0, 1], got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.intercept, 0.98);
        assert_eq!(config.weight_roads, -0.35);
        assert_eq!(config.weight_express_roads, 0.62);
        assert_eq!(config.threshold_score, 7);
        assert_eq!(config.cell_size, 40.0);
        assert_eq!(config.neighborhood_size, 3);
        assert_eq!(config.perturbation_degree, 1.0);
        assert_eq!(config.segmentation_degree, 0.7);
    }

    #[test]
    fn test_even_neighborhood_rejected() {
        let config = SimulationConfig {
            neighborhood_size: 4,
            ..Default::default()
        };
        match config.validate() {
            Err(GrowthError::InvalidConfiguration { parameter, .. }) => {
                assert_eq!(parameter, "neighborhood_size")
            }
            other => panic!("Expected InvalidConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn test_trivial_neighborhood_rejected() {
        let config = SimulationConfig {
            neighborhood_size: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_segmentation_degree_bounds_are_exclusive() {
        for bad in [0.2, 0.9, 0.1, 1.5, f64::NAN] {
            let config = SimulationConfig {
                segmentation_degree: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} should be rejected", bad);
        }
        let config = SimulationConfig {
            segmentation_degree: 0.21,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_cell_size_rejected() {
        let config = SimulationConfig {
            cell_size: -5.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_building_area_order_enforced() {
        let config = SimulationConfig {
            medium_building_area: 5000.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_category_weights_order() {
        let config = SimulationConfig::default();
        let weights = config.category_weights();
        assert_eq!(weights[ProximityCategory::Roads.index()], -0.35);
        assert_eq!(weights[ProximityCategory::SmallTownCenters.index()], -0.21);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            cell_size = 25.0
            neighborhood_size = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.cell_size, 25.0);
        assert_eq!(config.neighborhood_size, 5);
        assert_eq!(config.intercept, 0.98);
    }

    #[test]
    fn test_toml_validation_runs() {
        let result = SimulationConfig::from_toml_str("segmentation_degree = 0.95");
        assert!(matches!(
            result,
            Err(GrowthError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let result = SimulationConfig::from_toml_str("cell_size = [");
        assert!(matches!(result, Err(GrowthError::ConfigParse(_))));
    }
}
