//! Property tests for the model's structural guarantees
//!
//! - Segmentation always partitions the grid
//! - Suitability is pure and bounded
//! - Urban flags are monotone across iterations

use geo_types::point;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use urban_growth::core::types::{CellPos, ProximityCategory};
use urban_growth::landscape::suitability::{suitability, RegressionConstants};
use urban_growth::simulation::segmentation::{compact_segments, SeededWatershed, Segmenter};
use urban_growth::spatial::raster::Raster;
use urban_growth::{advance, Cell, Grid, SimulationConfig};

fn distance() -> impl Strategy<Value = f64> {
    prop_oneof![4 => 0.0..50_000.0f64, 1 => Just(f64::NAN)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn segmentation_is_a_partition(
        width in 2usize..24,
        height in 2usize..24,
        degree in 0.21f64..0.89,
        seed in any::<u64>(),
    ) {
        let values = (0..width * height).map(|k| ((k * 7919) % 101) as f64 / 101.0).collect();
        let brightness = Raster::from_vec(width, height, values);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let labels = SeededWatershed::new(degree).label(&brightness, &mut rng);
        let (ids, segments) = compact_segments(&labels);

        let mut seen = vec![0u32; width * height];
        for (k, segment) in segments.iter().enumerate() {
            prop_assert_eq!(segment.id.0 as usize, k + 1);
            prop_assert!(!segment.is_empty());
            for pos in &segment.cells {
                seen[pos.j * width + pos.i] += 1;
                prop_assert_eq!(ids.get(*pos), Some(&segment.id));
            }
        }
        prop_assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn suitability_is_pure_and_bounded(
        distances in prop::array::uniform8(distance()),
        fallback in 0.0..10_000.0f64,
        scale in -2.0..2.0f64,
    ) {
        let mut constants = RegressionConstants::from_config(&SimulationConfig::default());
        constants.scale = scale;
        let first = suitability(&distances, &constants, fallback);
        let second = suitability(&distances, &constants, fallback);
        prop_assert_eq!(first.to_bits(), second.to_bits());
        prop_assert!(first.is_finite());
        prop_assert!((0.0..=1.0).contains(&first));
    }

    #[test]
    fn urban_flags_are_monotone(
        width in 2usize..10,
        height in 2usize..10,
        seed in any::<u64>(),
        urban_mask in prop::collection::vec(any::<bool>(), 100),
    ) {
        let cells = (0..width * height)
            .map(|idx| {
                Cell::new(
                    CellPos::new(idx % width, idx / width),
                    point!(x: 0.0, y: 0.0),
                    idx % 7 != 3,
                    ((idx * 13) % 17) as f64 / 17.0,
                    [0.0; ProximityCategory::COUNT],
                    urban_mask[idx],
                )
            })
            .collect();
        let mut grid = Grid::from_cells(width, height, cells, SimulationConfig::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for _ in 0..3 {
            let before: Vec<bool> = grid.cells().iter().map(Cell::is_urban).collect();
            advance(&mut grid, &mut rng);
            for (cell, was_urban) in grid.cells().iter().zip(before) {
                prop_assert!(!was_urban || cell.is_urban());
                if !cell.is_land() {
                    prop_assert_eq!(cell.development_probability, 0.0);
                }
            }
        }
    }
}
