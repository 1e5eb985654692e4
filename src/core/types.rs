//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Meters spanned by one degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_319.444;

/// Simulation iteration counter (0 = freshly constructed grid)
pub type Iteration = u32;

/// Position of a cell in the grid: column `i` (west to east), row `j` (north to south)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub i: usize,
    pub j: usize,
}

impl CellPos {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }

    /// Offset this position, returning `None` when it leaves a `width` x `height` grid
    #[inline]
    pub fn offset(&self, di: isize, dj: isize, width: usize, height: usize) -> Option<CellPos> {
        let i = self.i as isize + di;
        let j = self.j as isize + dj;
        if i < 0 || j < 0 || i >= width as isize || j >= height as isize {
            None
        } else {
            Some(CellPos::new(i as usize, j as usize))
        }
    }
}

/// Identifier of a per-iteration segment (1-based, dense within one iteration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

/// When a cell became urban
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UrbanSince {
    /// Classified urban from the land-use data at grid construction
    Initial,
    /// Converted by the growth selector during this iteration
    Iteration(Iteration),
}

/// Feature classes whose distance feeds the suitability regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProximityCategory {
    Roads,
    ExpressRoads,
    Railways,
    Subways,
    MainCenters,
    DistrictCenters,
    LargeTownCenters,
    SmallTownCenters,
}

impl ProximityCategory {
    /// Number of categories (length of a distance vector)
    pub const COUNT: usize = 8;

    /// All categories in regression order
    pub const ALL: [ProximityCategory; Self::COUNT] = [
        ProximityCategory::Roads,
        ProximityCategory::ExpressRoads,
        ProximityCategory::Railways,
        ProximityCategory::Subways,
        ProximityCategory::MainCenters,
        ProximityCategory::DistrictCenters,
        ProximityCategory::LargeTownCenters,
        ProximityCategory::SmallTownCenters,
    ];

    /// Position of this category in distance vectors and regression weights
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Classify a settlement place by its `type` attribute
    pub fn from_place_type(place_type: &str) -> Option<Self> {
        match place_type {
            "city" | "locality" => Some(ProximityCategory::MainCenters),
            "quarter" | "neighbourhood" | "square" => Some(ProximityCategory::DistrictCenters),
            "town" | "village" => Some(ProximityCategory::LargeTownCenters),
            "hamlet" | "isolated_dwelling" | "isolated_dwellin" => {
                Some(ProximityCategory::SmallTownCenters)
            }
            _ => None,
        }
    }
}

/// One nearest-feature distance per proximity category, in meters (`NaN` = category empty)
pub type ProximityDistances = [f64; ProximityCategory::COUNT];

/// Land-use precedence tiers, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum LandUseTier {
    Commercial = 0,
    ResidentialIndustrial = 1,
    OtherUrban = 2,
    Other = 3,
}

impl LandUseTier {
    pub const ALL: [LandUseTier; 4] = [
        LandUseTier::Commercial,
        LandUseTier::ResidentialIndustrial,
        LandUseTier::OtherUrban,
        LandUseTier::Other,
    ];

    /// Classify a land-use polygon by its `type` attribute
    pub fn from_landuse_type(landuse_type: &str) -> Self {
        match landuse_type {
            "commercial" => LandUseTier::Commercial,
            "residential" | "industrial" => LandUseTier::ResidentialIndustrial,
            "retail" | "port" | "landfill" | "cemetery" | "grave_yard" | "park"
            | "recreation_ground" | "recreation_groun" | "playground" => LandUseTier::OtherUrban,
            _ => LandUseTier::Other,
        }
    }

    /// Points awarded for a cell inside a polygon of this tier
    ///
    /// Each tier awards one point fewer than the tier above it, floored at zero.
    pub fn containment_score(self, max_score: u32) -> u32 {
        max_score.saturating_sub(self as u32)
    }

    /// Points awarded for a cell within scanning range of (but outside) this tier
    pub fn proximity_score(self, max_score: u32) -> u32 {
        self.containment_score(max_score).saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_indices_follow_regression_order() {
        for (idx, category) in ProximityCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), idx);
        }
    }

    #[test]
    fn test_place_classification() {
        assert_eq!(
            ProximityCategory::from_place_type("city"),
            Some(ProximityCategory::MainCenters)
        );
        assert_eq!(
            ProximityCategory::from_place_type("neighbourhood"),
            Some(ProximityCategory::DistrictCenters)
        );
        assert_eq!(
            ProximityCategory::from_place_type("village"),
            Some(ProximityCategory::LargeTownCenters)
        );
        assert_eq!(
            ProximityCategory::from_place_type("hamlet"),
            Some(ProximityCategory::SmallTownCenters)
        );
        assert_eq!(ProximityCategory::from_place_type("farm"), None);
    }

    #[test]
    fn test_landuse_tier_scores() {
        assert_eq!(LandUseTier::Commercial.containment_score(4), 4);
        assert_eq!(LandUseTier::Commercial.proximity_score(4), 3);
        assert_eq!(LandUseTier::ResidentialIndustrial.containment_score(4), 3);
        assert_eq!(LandUseTier::OtherUrban.proximity_score(4), 1);
        assert_eq!(LandUseTier::Other.containment_score(2), 0);
        assert_eq!(LandUseTier::Other.proximity_score(0), 0);
    }

    #[test]
    fn test_landuse_classification() {
        assert_eq!(LandUseTier::from_landuse_type("commercial"), LandUseTier::Commercial);
        assert_eq!(
            LandUseTier::from_landuse_type("industrial"),
            LandUseTier::ResidentialIndustrial
        );
        assert_eq!(LandUseTier::from_landuse_type("park"), LandUseTier::OtherUrban);
        assert_eq!(LandUseTier::from_landuse_type("farmland"), LandUseTier::Other);
    }

    #[test]
    fn test_offset_respects_bounds() {
        let pos = CellPos::new(0, 2);
        assert_eq!(pos.offset(-1, 0, 3, 3), None);
        assert_eq!(pos.offset(1, 0, 3, 3), Some(CellPos::new(1, 2)));
        assert_eq!(pos.offset(0, 1, 3, 3), None);
    }
}
