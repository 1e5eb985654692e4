//! Proximity index over the feature store
//!
//! Sorts features into category-specific R-tree layers once, then answers
//! the two questions grid construction asks of every cell centroid: how far
//! is the nearest feature of each proximity category, and is the centroid
//! under water. Distances are memoized through an injected [`DistanceCache`].

use std::sync::RwLock;

use ahash::AHashMap;
use geo_types::Point;

use crate::core::config::SimulationConfig;
use crate::core::types::{LandUseTier, ProximityCategory, ProximityDistances};
use crate::features::{Dataset, Feature, FeatureStore};
use crate::spatial::layer::{CorridorLayer, FeatureLayer, IndexedShape, RiverCorridor, Shape};

/// Cache key: a proximity category plus the exact bit pattern of a query point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DistanceKey {
    pub category: ProximityCategory,
    x_bits: u64,
    y_bits: u64,
}

impl DistanceKey {
    pub fn new(category: ProximityCategory, point: &Point<f64>) -> Self {
        Self {
            category,
            x_bits: point.x().to_bits(),
            y_bits: point.y().to_bits(),
        }
    }
}

/// Memoization store for nearest-feature distances
///
/// Shared across threads during parallel grid construction.
pub trait DistanceCache: Send + Sync {
    fn get(&self, key: &DistanceKey) -> Option<f64>;
    fn insert(&self, key: DistanceKey, distance: f64);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Default in-memory cache: a read-mostly hash map behind a lock
#[derive(Debug, Default)]
pub struct MemoDistanceCache {
    entries: RwLock<AHashMap<DistanceKey, f64>>,
}

impl MemoDistanceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DistanceCache for MemoDistanceCache {
    fn get(&self, key: &DistanceKey) -> Option<f64> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).copied(),
            Err(poisoned) => poisoned.into_inner().get(key).copied(),
        }
    }

    fn insert(&self, key: DistanceKey, distance: f64) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key, distance);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key, distance);
            }
        }
    }

    fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Category-specific spatial indexes plus the auxiliary layers used for
/// water masking and land-use classification
pub struct ProximityIndex {
    categories: [FeatureLayer; ProximityCategory::COUNT],
    water: FeatureLayer,
    rivers: CorridorLayer,
    points: FeatureLayer,
    buildings: FeatureLayer,
    footways: FeatureLayer,
    landuse: [FeatureLayer; 4],
    cache: Box<dyn DistanceCache>,
}

#[derive(Default)]
struct LayerBuckets {
    categories: [Vec<IndexedShape>; ProximityCategory::COUNT],
    water: Vec<IndexedShape>,
    rivers: Vec<RiverCorridor>,
    points: Vec<IndexedShape>,
    buildings: Vec<IndexedShape>,
    footways: Vec<IndexedShape>,
    landuse: [Vec<IndexedShape>; 4],
    skipped: usize,
}

impl LayerBuckets {
    fn push(target: &mut Vec<IndexedShape>, shape: Option<Shape>, skipped: &mut usize) {
        match shape.and_then(IndexedShape::new) {
            Some(indexed) => target.push(indexed),
            None => *skipped += 1,
        }
    }
}

impl ProximityIndex {
    /// Index a feature store with the default memo cache
    pub fn build(store: &FeatureStore, config: &SimulationConfig) -> Self {
        Self::with_cache(store, config, Box::new(MemoDistanceCache::new()))
    }

    /// Index a feature store, memoizing distances in `cache`
    pub fn with_cache(
        store: &FeatureStore,
        config: &SimulationConfig,
        cache: Box<dyn DistanceCache>,
    ) -> Self {
        let mut buckets = LayerBuckets::default();

        for feature in store.features(Dataset::Roads) {
            let category = match feature.number("maxspeed") {
                Some(speed) if speed >= config.min_expressway_speed => ProximityCategory::ExpressRoads,
                _ => ProximityCategory::Roads,
            };
            let shape = Shape::lines(&feature.geometry);
            if feature.feature_type() == Some("footway") {
                LayerBuckets::push(&mut buckets.footways, shape.clone(), &mut buckets.skipped);
            }
            LayerBuckets::push(
                &mut buckets.categories[category.index()],
                shape,
                &mut buckets.skipped,
            );
        }

        for feature in store.features(Dataset::Railways) {
            let category = if feature.feature_type() == Some("subway") {
                ProximityCategory::Subways
            } else {
                ProximityCategory::Railways
            };
            LayerBuckets::push(
                &mut buckets.categories[category.index()],
                Shape::lines(&feature.geometry),
                &mut buckets.skipped,
            );
        }

        for feature in store.features(Dataset::Places) {
            let Some(category) = feature.feature_type().and_then(ProximityCategory::from_place_type)
            else {
                continue;
            };
            push_points(&mut buckets.categories[category.index()], feature, &mut buckets.skipped);
        }

        for feature in store
            .features(Dataset::Natural)
            .filter(|f| f.feature_type() == Some("water"))
        {
            LayerBuckets::push(&mut buckets.water, Shape::area(&feature.geometry), &mut buckets.skipped);
        }

        for feature in store
            .features(Dataset::Waterways)
            .filter(|f| f.feature_type() == Some("river"))
        {
            let width = feature
                .number("width")
                .filter(|w| w.is_finite() && *w > 0.0)
                .unwrap_or(config.default_river_width);
            match Shape::lines(&feature.geometry) {
                Some(Shape::Lines(lines)) => {
                    for line in lines {
                        match RiverCorridor::new(line, width) {
                            Some(corridor) => buckets.rivers.push(corridor),
                            None => buckets.skipped += 1,
                        }
                    }
                }
                _ => buckets.skipped += 1,
            }
        }

        for feature in store.features(Dataset::Points) {
            push_points(&mut buckets.points, feature, &mut buckets.skipped);
        }

        for feature in store.features(Dataset::Buildings) {
            LayerBuckets::push(&mut buckets.buildings, Shape::area(&feature.geometry), &mut buckets.skipped);
        }

        for feature in store.features(Dataset::Landuse) {
            let tier = LandUseTier::from_landuse_type(feature.feature_type().unwrap_or_default());
            LayerBuckets::push(
                &mut buckets.landuse[tier as usize],
                Shape::area(&feature.geometry),
                &mut buckets.skipped,
            );
        }

        if buckets.skipped > 0 {
            tracing::warn!(
                "Skipped {} features whose geometry does not fit their layer",
                buckets.skipped
            );
        }

        let index = Self {
            categories: buckets.categories.map(FeatureLayer::bulk_load),
            water: FeatureLayer::bulk_load(buckets.water),
            rivers: CorridorLayer::bulk_load(buckets.rivers),
            points: FeatureLayer::bulk_load(buckets.points),
            buildings: FeatureLayer::bulk_load(buckets.buildings),
            footways: FeatureLayer::bulk_load(buckets.footways),
            landuse: buckets.landuse.map(FeatureLayer::bulk_load),
            cache,
        };

        tracing::info!(
            roads = index.category(ProximityCategory::Roads).len(),
            express_roads = index.category(ProximityCategory::ExpressRoads).len(),
            railways = index.category(ProximityCategory::Railways).len(),
            subways = index.category(ProximityCategory::Subways).len(),
            water = index.water.len(),
            rivers = index.rivers.len(),
            points = index.points.len(),
            buildings = index.buildings.len(),
            "Built proximity index"
        );
        for category in ProximityCategory::ALL {
            if index.category(category).is_empty() {
                tracing::debug!("No features for {:?}, distances fall back", category);
            }
        }

        index
    }

    /// Layer holding one proximity category
    pub fn category(&self, category: ProximityCategory) -> &FeatureLayer {
        &self.categories[category.index()]
    }

    pub fn points(&self) -> &FeatureLayer {
        &self.points
    }

    pub fn buildings(&self) -> &FeatureLayer {
        &self.buildings
    }

    pub fn footways(&self) -> &FeatureLayer {
        &self.footways
    }

    pub fn landuse(&self, tier: LandUseTier) -> &FeatureLayer {
        &self.landuse[tier as usize]
    }

    /// Geodesic meters from `point` to the nearest feature of `category`
    ///
    /// Returns `NaN` when the category has no features.
    pub fn nearest_distance(&self, category: ProximityCategory, point: &Point<f64>) -> f64 {
        let key = DistanceKey::new(category, point);
        if let Some(distance) = self.cache.get(&key) {
            return distance;
        }
        match self.category(category).nearest_distance_m(point) {
            Some(distance) if distance.is_finite() => {
                self.cache.insert(key, distance);
                distance
            }
            _ => f64::NAN,
        }
    }

    /// Distance vector over every proximity category
    pub fn nearest_distances(&self, point: &Point<f64>) -> ProximityDistances {
        ProximityCategory::ALL.map(|category| self.nearest_distance(category, point))
    }

    /// Inside the nearest water polygon, or inside any river corridor
    pub fn is_in_water(&self, point: &Point<f64>) -> bool {
        self.water.nearest_contains(point) || self.rivers.contains(point)
    }

    /// Number of memoized distances
    pub fn cached_distances(&self) -> usize {
        self.cache.len()
    }
}

fn push_points(target: &mut Vec<IndexedShape>, feature: &Feature, skipped: &mut usize) {
    let shapes = Shape::points(&feature.geometry);
    if shapes.is_empty() {
        *skipped += 1;
    }
    for shape in shapes {
        LayerBuckets::push(target, Some(shape), skipped);
    }
}
