//! Grid cell: static landscape attributes plus per-iteration state

use geo_types::Point;

use crate::core::types::{CellPos, Iteration, ProximityDistances, SegmentId, UrbanSince};

/// One square unit of the landscape
///
/// `land`, `suitability` and `distances` are fixed at construction. The
/// transient fields are rewritten by every iteration's neighborhood phase and
/// segmentation; `urban_since` only ever goes from `None` to `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub pos: CellPos,
    /// Center of the cell footprint in lon/lat degrees
    pub centroid: Point<f64>,
    land: bool,
    suitability: f64,
    distances: ProximityDistances,

    // Per-iteration state
    /// Fraction of urban cells in the `m x m` window around the cell
    pub neighborhood_mean: f64,
    /// Uniform draw `r` in `(0, 1)` behind the resistance term
    pub perturbation_draw: f64,
    /// Stochastic resistance `RA = 1 + (-ln r)^p`
    pub resistance: f64,
    pub development_probability: f64,
    pub segment: Option<SegmentId>,

    urban_since: Option<UrbanSince>,
}

impl Cell {
    pub fn new(
        pos: CellPos,
        centroid: Point<f64>,
        land: bool,
        suitability: f64,
        distances: ProximityDistances,
        initially_urban: bool,
    ) -> Self {
        Self {
            pos,
            centroid,
            land,
            suitability,
            distances,
            neighborhood_mean: 0.0,
            perturbation_draw: 0.0,
            resistance: 1.0,
            development_probability: 0.0,
            segment: None,
            urban_since: initially_urban.then_some(UrbanSince::Initial),
        }
    }

    /// `false` for cells under water; water never urbanizes
    #[inline]
    pub fn is_land(&self) -> bool {
        self.land
    }

    /// Logistic suitability coefficient in `[0, 1]`
    #[inline]
    pub fn suitability(&self) -> f64 {
        self.suitability
    }

    /// Nearest-feature distance per proximity category (`NaN` = none)
    pub fn distances(&self) -> &ProximityDistances {
        &self.distances
    }

    #[inline]
    pub fn is_urban(&self) -> bool {
        self.urban_since.is_some()
    }

    pub fn urban_since(&self) -> Option<UrbanSince> {
        self.urban_since
    }

    /// Mark the cell urban as of `iteration`
    ///
    /// Returns `false` (and keeps the original stamp) if it already was urban.
    pub fn mark_urban(&mut self, iteration: Iteration) -> bool {
        if self.is_urban() {
            return false;
        }
        self.urban_since = Some(UrbanSince::Iteration(iteration));
        true
    }

    /// Converted during `iteration`
    pub fn is_newly_urban(&self, iteration: Iteration) -> bool {
        self.urban_since == Some(UrbanSince::Iteration(iteration))
    }

    /// Non-urban land, the only kind of cell growth may convert
    #[inline]
    pub fn is_developable(&self) -> bool {
        self.land && !self.is_urban()
    }

    /// Averaged input to segmentation
    pub fn brightness(&self) -> f64 {
        (self.perturbation_draw
            + self.development_probability
            + self.neighborhood_mean
            + self.suitability)
            / 4.0
    }
}
