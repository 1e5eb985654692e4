//! Geometry feature store
//!
//! Holds the eight labeled feature collections the simulation consumes
//! (settlements, railways, roads, natural areas, points of interest,
//! buildings, waterways, land use). Decoding these from disk is the job of
//! the caller; the store only exposes iteration, attributes and the overall
//! bounding extent.

use ahash::AHashMap;
use geo::BoundingRect;
use geo_types::{Geometry, Rect};
use serde::{Deserialize, Serialize};

/// The labeled collections a dataset is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    Places,
    Railways,
    Roads,
    Natural,
    Points,
    Buildings,
    Waterways,
    Landuse,
}

impl Dataset {
    pub const COUNT: usize = 8;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// A named feature attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Number(_) => None,
        }
    }

    /// Numeric value; numeric text such as `"60"` is parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// A single geographic feature: geometry in lon/lat degrees plus attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: AHashMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            attributes: AHashMap::new(),
        }
    }

    /// Builder: set the `type` attribute
    pub fn with_type(self, feature_type: &str) -> Self {
        self.with_attribute("type", feature_type)
    }

    /// Builder: set an arbitrary attribute
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// The `type` attribute as text
    pub fn feature_type(&self) -> Option<&str> {
        self.attribute("type").and_then(AttributeValue::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(AttributeValue::as_f64)
    }
}

/// Features of one dataset
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding rectangle of every feature in the collection
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .reduce(merge_rects)
    }
}

/// All loaded feature collections, one per [`Dataset`]
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    collections: [FeatureCollection; Dataset::COUNT],
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature to a dataset
    pub fn insert(&mut self, dataset: Dataset, feature: Feature) {
        self.collections[dataset.index()].push(feature);
    }

    /// Builder form of [`FeatureStore::insert`]
    pub fn with(mut self, dataset: Dataset, feature: Feature) -> Self {
        self.insert(dataset, feature);
        self
    }

    pub fn collection(&self, dataset: Dataset) -> &FeatureCollection {
        &self.collections[dataset.index()]
    }

    /// Iterate over the features of one dataset
    pub fn features(&self, dataset: Dataset) -> impl Iterator<Item = &Feature> {
        self.collection(dataset).iter()
    }

    /// Total number of features across all datasets
    pub fn len(&self) -> usize {
        self.collections.iter().map(FeatureCollection::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.iter().all(FeatureCollection::is_empty)
    }

    /// Bounding extent of the whole dataset (union over every collection)
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.collections
            .iter()
            .filter_map(FeatureCollection::bounds)
            .reduce(merge_rects)
    }
}

fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
        (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
    )
}
