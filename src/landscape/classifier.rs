//! Initial land-use classification
//!
//! Decides, once per cell at grid construction, whether the centroid already
//! sits in built-up land. Four independent signals add up to an integer
//! score; the cell starts urban when the score reaches `threshold_score`.
//! Later urbanization is left entirely to the growth phase.

use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::LandUseTier;
use crate::spatial::proximity::ProximityIndex;

/// Per-signal breakdown of a classification score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandUseScore {
    pub points: u32,
    pub buildings: u32,
    pub land_use: u32,
    pub footway: u32,
}

impl LandUseScore {
    pub fn total(&self) -> u32 {
        self.points + self.buildings + self.land_use + self.footway
    }
}

/// Scores centroids against the point, building, land-use and footway layers
pub struct UrbanClassifier<'a> {
    index: &'a ProximityIndex,
    config: &'a SimulationConfig,
}

impl<'a> UrbanClassifier<'a> {
    pub fn new(index: &'a ProximityIndex, config: &'a SimulationConfig) -> Self {
        Self { index, config }
    }

    /// Whether the centroid scores at least `threshold_score`
    pub fn is_urban(&self, centroid: &Point<f64>) -> bool {
        self.score(centroid).total() >= self.config.threshold_score
    }

    pub fn score(&self, centroid: &Point<f64>) -> LandUseScore {
        LandUseScore {
            points: self.point_score(centroid),
            buildings: self.building_score(centroid),
            land_use: self.land_use_score(centroid),
            footway: self.footway_score(centroid),
        }
    }

    /// Awarded only when the `point_threshold` nearest points all lie within one cell width
    fn point_score(&self, centroid: &Point<f64>) -> u32 {
        let k = self.config.point_threshold;
        let within = self
            .index
            .points()
            .nearest_k(centroid, k)
            .take_while(|p| p.distance_m(centroid) <= self.config.cell_size)
            .count();
        if within == k {
            self.config.point_score
        } else {
            0
        }
    }

    fn building_score(&self, centroid: &Point<f64>) -> u32 {
        let cfg = self.config;
        let mut nearby = 0;
        let mut area = 0.0;
        for building in self
            .index
            .buildings()
            .nearest_k(centroid, cfg.building_window)
            .take_while(|b| b.distance_m(centroid) <= cfg.scanning_radius)
        {
            nearby += 1;
            area += building.area_m2.min(cfg.building_area_cap);
        }

        let mut score = 0;
        if nearby == cfg.building_window {
            score += cfg.building_window_score;
        }
        if area >= cfg.large_building_area {
            score += cfg.large_building_score;
        } else if area >= cfg.medium_building_area {
            score += cfg.medium_building_score;
        }
        score
    }

    /// Best tier score: containment scores the tier outright, nearby one lower
    fn land_use_score(&self, centroid: &Point<f64>) -> u32 {
        let max = self.config.max_landuse_score;
        LandUseTier::ALL
            .iter()
            .map(|&tier| {
                let layer = self.index.landuse(tier);
                if layer.nearest_contains(centroid) {
                    tier.containment_score(max)
                } else if layer.any_within(centroid, self.config.scanning_radius) {
                    tier.proximity_score(max)
                } else {
                    0
                }
            })
            .max()
            .unwrap_or(0)
    }

    fn footway_score(&self, centroid: &Point<f64>) -> u32 {
        if self
            .index
            .footways()
            .any_within(centroid, self.config.scanning_radius)
        {
            self.config.footway_score
        } else {
            0
        }
    }
}
