//! Landscape grid and its construction from the feature store
//!
//! [`build_grid`] lays a square lattice over the dataset's bounding extent
//! and fixes, for every cell, the static attributes growth depends on:
//! distances to each proximity category, the water mask, the suitability
//! coefficient and the initial urban classification.

pub mod cell;
pub mod classifier;
pub mod suitability;

use geo_types::{Point, Rect};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{GrowthError, Result};
use crate::core::types::{CellPos, Iteration, UrbanSince, METERS_PER_DEGREE};
use crate::features::FeatureStore;
use crate::spatial::proximity::ProximityIndex;
use crate::spatial::raster::Raster;

pub use cell::Cell;
pub use classifier::{LandUseScore, UrbanClassifier};
pub use suitability::{suitability, RegressionConstants};

/// The simulated landscape: a row-major raster of cells plus iteration state
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Raster<Cell>,
    /// Validated parameters every iteration runs with
    config: SimulationConfig,
    /// Dataset extent the lattice covers, `None` for hand-built grids
    bounds: Option<Rect<f64>>,
    /// Distance substituted for categories without features
    fallback_distance: f64,
    iteration: Iteration,
    segment_count: usize,
}

/// Serializable snapshot of a grid's headline counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSummary {
    pub iteration: Iteration,
    pub width: usize,
    pub height: usize,
    pub land_cells: usize,
    pub urban_cells: usize,
    pub initial_urban_cells: usize,
    /// Cells converted during the latest iteration
    pub newly_urban_cells: usize,
    /// Segments the latest iteration partitioned the grid into
    pub segments: usize,
}

impl Grid {
    /// Assemble a grid from cells in row-major order
    ///
    /// Each cell's `pos` is reset to its place in the raster. Fails fast when
    /// `config` does not validate.
    pub fn from_cells(
        width: usize,
        height: usize,
        mut cells: Vec<Cell>,
        config: SimulationConfig,
    ) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(GrowthError::invalid("grid", format!("dimensions {}x{} are empty", width, height)));
        }
        let count = cell_count(width, height).ok_or_else(|| {
            GrowthError::invalid("grid", format!("{}x{} exceeds the cell limit", width, height))
        })?;
        if cells.len() != count {
            return Err(GrowthError::invalid(
                "grid",
                format!("{} cells do not fill a {}x{} grid", cells.len(), width, height),
            ));
        }
        for (idx, cell) in cells.iter_mut().enumerate() {
            cell.pos = CellPos::new(idx % width, idx / width);
        }
        Ok(Self {
            cells: Raster::from_vec(width, height, cells),
            config,
            bounds: None,
            fallback_distance: 0.0,
            iteration: 0,
            segment_count: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.cells.width
    }

    pub fn height(&self) -> usize {
        self.cells.height
    }

    /// Number of cells (`width * height`)
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Completed iterations; 0 right after construction
    pub fn iteration(&self) -> Iteration {
        self.iteration
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    pub fn fallback_distance(&self) -> f64 {
        self.fallback_distance
    }

    /// Segments produced by the latest iteration (0 before the first)
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        self.cells.get(pos)
    }

    /// All cells in row-major order
    pub fn cells(&self) -> &[Cell] {
        self.cells.values()
    }

    /// Cells for an iteration to mutate, alongside the parameters it reads
    pub(crate) fn parts_mut(&mut self) -> (&mut Raster<Cell>, &SimulationConfig) {
        (&mut self.cells, &self.config)
    }

    pub(crate) fn finish_iteration(&mut self, iteration: Iteration, segment_count: usize) {
        debug_assert_eq!(iteration, self.iteration + 1);
        self.iteration = iteration;
        self.segment_count = segment_count;
    }

    pub fn summary(&self) -> GridSummary {
        let mut summary = GridSummary {
            iteration: self.iteration,
            width: self.width(),
            height: self.height(),
            land_cells: 0,
            urban_cells: 0,
            initial_urban_cells: 0,
            newly_urban_cells: 0,
            segments: self.segment_count,
        };
        for cell in self.cells() {
            if cell.is_land() {
                summary.land_cells += 1;
            }
            match cell.urban_since() {
                Some(UrbanSince::Initial) => {
                    summary.urban_cells += 1;
                    summary.initial_urban_cells += 1;
                }
                Some(UrbanSince::Iteration(it)) => {
                    summary.urban_cells += 1;
                    if it == self.iteration && it > 0 {
                        summary.newly_urban_cells += 1;
                    }
                }
                None => {}
            }
        }
        summary
    }
}

/// Build the landscape grid for a feature store
///
/// Fails fast on an invalid configuration and on a store with no geometry.
/// Per-cell work runs on the rayon pool once the cell count reaches
/// `parallel_threshold`.
pub fn build_grid(store: &FeatureStore, config: &SimulationConfig) -> Result<Grid> {
    config.validate()?;
    let bounds = store.bounds().ok_or(GrowthError::EmptyExtent)?;

    let extent_w = bounds.width();
    let extent_h = bounds.height();
    let width = lattice_span(extent_w, config.cell_size)?;
    let height = lattice_span(extent_h, config.cell_size)?;
    let count = cell_count(width, height).ok_or_else(|| {
        GrowthError::invalid(
            "cell_size",
            format!("{} m cells give a {}x{} lattice, too many cells", config.cell_size, width, height),
        )
    })?;
    let fallback_distance = extent_w.min(extent_h) * METERS_PER_DEGREE / 2.0;
    let cell_deg = config.cell_size / METERS_PER_DEGREE;
    let (min_x, max_y) = (bounds.min().x, bounds.max().y);

    tracing::info!(
        width,
        height,
        cell_size = config.cell_size,
        features = store.len(),
        "Building grid"
    );

    let index = ProximityIndex::build(store, config);
    let classifier = UrbanClassifier::new(&index, config);
    let constants = RegressionConstants::from_config(config);

    let make_cell = |idx: usize| {
        let pos = CellPos::new(idx % width, idx / width);
        let centroid = Point::new(
            min_x + (pos.i as f64 + 0.5) * cell_deg,
            max_y - (pos.j as f64 + 0.5) * cell_deg,
        );
        let distances = index.nearest_distances(&centroid);
        let land = !index.is_in_water(&centroid);
        let coefficient = suitability(&distances, &constants, fallback_distance);
        let urban = classifier.is_urban(&centroid);
        Cell::new(pos, centroid, land, coefficient, distances, urban)
    };

    let cells: Vec<Cell> = if count >= config.parallel_threshold {
        (0..count).into_par_iter().map(make_cell).collect()
    } else {
        (0..count).map(make_cell).collect()
    };

    let grid = Grid {
        cells: Raster::from_vec(width, height, cells),
        config: config.clone(),
        bounds: Some(bounds),
        fallback_distance,
        iteration: 0,
        segment_count: 0,
    };

    let summary = grid.summary();
    tracing::info!(
        land = summary.land_cells,
        urban = summary.urban_cells,
        cached_distances = index.cached_distances(),
        "Grid ready"
    );
    Ok(grid)
}

/// Segment labels are `u32` with 0 and `u32::MAX` reserved
const MAX_CELLS: usize = (u32::MAX - 2) as usize;

/// `width * height` if a grid that size can be labeled and allocated
fn cell_count(width: usize, height: usize) -> Option<usize> {
    let count = width.checked_mul(height)?;
    let bytes = count.checked_mul(std::mem::size_of::<Cell>())?;
    (count <= MAX_CELLS && bytes <= isize::MAX as usize).then_some(count)
}

/// Cells needed to cover `extent_deg` degrees (at least one)
fn lattice_span(extent_deg: f64, cell_size: f64) -> Result<usize> {
    let cells = (extent_deg * METERS_PER_DEGREE / cell_size).ceil();
    if !cells.is_finite() || cells > u32::MAX as f64 {
        return Err(GrowthError::invalid(
            "cell_size",
            format!("{} m cells give an unbounded lattice over the extent", cell_size),
        ));
    }
    Ok((cells as usize).max(1))
}
