//! Spatial primitives: rasters, R-tree feature layers and the proximity index

pub mod layer;
pub mod proximity;
pub mod raster;

pub use layer::{FeatureLayer, IndexedShape, Shape};
pub use proximity::{DistanceCache, DistanceKey, MemoDistanceCache, ProximityIndex};
pub use raster::Raster;
