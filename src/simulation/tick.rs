//! Iteration orchestrator
//!
//! One iteration runs three phases, each over the whole grid before the next
//! starts:
//! neighborhood + perturbation -> segmentation -> growth selection
//!
//! An iteration is never left half done: `advance` only returns after the
//! growth pass has finished and the grid's iteration counter has moved.
//! Parameters come from the grid itself, which only ever holds a validated
//! configuration.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::landscape::{Grid, GridSummary};
use crate::simulation::growth::{select_growth, GrowthReport};
use crate::simulation::neighborhood::update_neighborhood;
use crate::simulation::segmentation::{segment_cells, SeededWatershed, Segmenter};

/// Default random source: fast, seedable and reproducible across platforms
pub type SimRng = ChaCha8Rng;

/// Advance `grid` by exactly one iteration using the seeded watershed
pub fn advance(grid: &mut Grid, rng: &mut dyn RngCore) {
    let segmenter = SeededWatershed::new(grid.config().segmentation_degree);
    advance_with(grid, &segmenter, rng);
}

/// Advance `grid` by one iteration with a caller-chosen segmenter
pub fn advance_with(grid: &mut Grid, segmenter: &dyn Segmenter, rng: &mut dyn RngCore) -> GrowthReport {
    let iteration = grid.iteration() + 1;
    let (cells, config) = grid.parts_mut();

    // 1. Neighborhood density, perturbation, development probability
    update_neighborhood(
        cells,
        config.neighborhood_size,
        config.perturbation_degree,
        &mut *rng,
    );

    // 2. Partition into segments
    let segments = segment_cells(cells, segmenter, &mut *rng);
    tracing::debug!(iteration, segments = segments.len(), "Segmented grid");

    // 3. Grow segments, highest utility first
    let report = select_growth(cells, &segments, config, iteration, &mut *rng);
    grid.finish_iteration(iteration, segments.len());

    tracing::debug!(
        iteration,
        organic = report.organic_segments,
        spontaneous = report.spontaneous_segments,
        exhausted = report.exhausted_segments,
        "Growth regimes"
    );
    tracing::info!(
        iteration,
        converted = report.converted_cells,
        "Iteration complete"
    );
    report
}

/// A grid bundled with its segmenter and random source
pub struct Simulation<R: RngCore = SimRng> {
    grid: Grid,
    segmenter: Box<dyn Segmenter>,
    rng: R,
}

impl Simulation<SimRng> {
    /// Simulation drawing from an OS-seeded generator
    pub fn new(grid: Grid) -> Self {
        Self::with_rng(grid, SimRng::from_entropy())
    }

    /// Reproducible simulation from a fixed seed
    pub fn seeded(grid: Grid, seed: u64) -> Self {
        Self::with_rng(grid, SimRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> Simulation<R> {
    /// Simulation drawing from an injected generator
    pub fn with_rng(grid: Grid, rng: R) -> Self {
        let segmenter = Box::new(SeededWatershed::new(grid.config().segmentation_degree));
        Self {
            grid,
            segmenter,
            rng,
        }
    }

    /// Replace the default seeded watershed
    pub fn with_segmenter(mut self, segmenter: Box<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Run one iteration
    pub fn advance(&mut self) -> GrowthReport {
        advance_with(&mut self.grid, self.segmenter.as_ref(), &mut self.rng)
    }

    /// Run `iterations` whole iterations, returning a summary after each
    pub fn run(&mut self, iterations: u32) -> Vec<GridSummary> {
        (0..iterations)
            .map(|_| {
                self.advance();
                self.grid.summary()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::error::{GrowthError, Result};
    use crate::core::types::CellPos;
    use crate::landscape::Cell;
    use geo_types::point;

    fn uniform_grid(width: usize, height: usize, urban: &[usize]) -> Grid {
        grid_with(width, height, urban, SimulationConfig::default()).unwrap()
    }

    fn grid_with(width: usize, height: usize, urban: &[usize], config: SimulationConfig) -> Result<Grid> {
        let cells = (0..width * height)
            .map(|idx| {
                Cell::new(
                    CellPos::new(0, 0),
                    point!(x: 0.0, y: 0.0),
                    true,
                    0.5,
                    [0.0; 8],
                    urban.contains(&idx),
                )
            })
            .collect();
        Grid::from_cells(width, height, cells, config)
    }

    #[test]
    fn test_advance_moves_iteration() {
        let mut grid = uniform_grid(5, 5, &[]);
        let mut rng = SimRng::seed_from_u64(42);
        advance(&mut grid, &mut rng);
        assert_eq!(grid.iteration(), 1);
        assert!(grid.segment_count() >= 1);
        for cell in grid.cells() {
            assert!(cell.segment.is_some());
            assert!(cell.segment.unwrap().0 as usize <= grid.segment_count());
        }
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let mut a = Simulation::seeded(uniform_grid(8, 6, &[20]), 7);
        let mut b = Simulation::seeded(uniform_grid(8, 6, &[20]), 7);
        assert_eq!(a.run(4), b.run(4));
        assert_eq!(a.grid().cells(), b.grid().cells());
    }

    #[test]
    fn test_run_reports_each_iteration() {
        let mut sim = Simulation::seeded(uniform_grid(6, 6, &[14, 15]), 42);
        let summaries = sim.run(3);
        assert_eq!(summaries.len(), 3);
        for (k, summary) in summaries.iter().enumerate() {
            assert_eq!(summary.iteration, k as u32 + 1);
            assert_eq!(summary.initial_urban_cells, 2);
        }
        assert!(summaries.windows(2).all(|w| w[0].urban_cells <= w[1].urban_cells));
    }

    #[test]
    fn test_invalid_config_never_reaches_advance() {
        let config = SimulationConfig {
            segmentation_degree: 0.95,
            ..SimulationConfig::default()
        };
        assert!(grid_with(2, 2, &[], config).is_err());

        // a NaN degree would otherwise push every development probability to 1
        let config = SimulationConfig {
            perturbation_degree: f64::NAN,
            neighborhood_size: 4,
            ..SimulationConfig::default()
        };
        let err = grid_with(4, 4, &[], config).unwrap_err();
        assert!(matches!(err, GrowthError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_advance_uses_grid_config() {
        let config = SimulationConfig {
            perturbation_degree: 2.0,
            neighborhood_size: 5,
            ..SimulationConfig::default()
        };
        let mut grid = grid_with(6, 6, &[0, 7, 14], config.clone()).unwrap();
        let mut rng = SimRng::seed_from_u64(42);
        advance(&mut grid, &mut rng);
        assert_eq!(grid.config(), &config);
        for cell in grid.cells() {
            let expected = 1.0 + (-cell.perturbation_draw.ln()).powf(2.0);
            assert!((cell.resistance - expected).abs() < 1e-12);
            assert!(cell.development_probability > 0.0 && cell.development_probability <= 1.0);
        }
    }

    #[test]
    fn test_custom_segmenter() {
        struct Halves;
        impl Segmenter for Halves {
            fn label(
                &self,
                brightness: &crate::spatial::raster::Raster<f64>,
                _rng: &mut dyn RngCore,
            ) -> crate::spatial::raster::Raster<u32> {
                let labels = brightness
                    .positions()
                    .map(|pos| if pos.i < brightness.width / 2 { 1 } else { 2 })
                    .collect();
                crate::spatial::raster::Raster::from_vec(brightness.width, brightness.height, labels)
            }
        }

        let mut sim = Simulation::seeded(uniform_grid(4, 2, &[]), 3).with_segmenter(Box::new(Halves));
        sim.advance();
        assert_eq!(sim.grid().segment_count(), 2);
    }
}
