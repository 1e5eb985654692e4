//! Neighborhood density and stochastic perturbation
//!
//! First phase of every iteration. For each cell it measures how urban the
//! surrounding `m x m` window is, draws a fresh resistance term and combines
//! both with the static suitability into the development probability the
//! later phases read.

use rand::distributions::Open01;
use rand::Rng;

use crate::core::types::CellPos;
use crate::landscape::Cell;
use crate::spatial::raster::Raster;

/// Fraction of urban cells in the square window of side `side` around `pos`
///
/// The window is clamped to the raster and excludes the center; with no
/// in-bounds neighbor (a 1x1 grid) the fraction is 0.
pub fn neighborhood_mean(cells: &Raster<Cell>, pos: CellPos, side: usize) -> f64 {
    window_urban_fraction(cells, pos, side / 2)
}

/// Fraction of urban cells within Chebyshev `radius` of `pos`, center excluded
///
/// Only the part of the window inside the raster is visited, so the cost is
/// bounded by the grid size however large `radius` is.
pub(crate) fn window_urban_fraction(cells: &Raster<Cell>, pos: CellPos, radius: usize) -> f64 {
    let i_range = pos.i.saturating_sub(radius)..=pos.i.saturating_add(radius).min(cells.width - 1);
    let j_range = pos.j.saturating_sub(radius)..=pos.j.saturating_add(radius).min(cells.height - 1);

    let mut total = 0u32;
    let mut urban = 0u32;
    for j in j_range {
        for i in i_range.clone() {
            if i == pos.i && j == pos.j {
                continue;
            }
            total += 1;
            if cells.values()[j * cells.width + i].is_urban() {
                urban += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        urban as f64 / total as f64
    }
}

/// Resistance `RA = 1 + (-ln r)^p`
#[inline]
pub fn resistance(draw: f64, perturbation_degree: f64) -> f64 {
    1.0 + (-draw.ln()).powf(perturbation_degree)
}

/// `min(1, RA * (suitability + neighborhood))` on land, 0 on water
#[inline]
pub fn development_probability(cell: &Cell) -> f64 {
    if cell.is_land() {
        (cell.resistance * (cell.suitability() + cell.neighborhood_mean)).min(1.0)
    } else {
        0.0
    }
}

/// Refresh every cell's neighborhood mean, perturbation and development probability
///
/// Neighborhood means are all measured before any cell is written, and one
/// `(0, 1)` draw is taken per cell in row-major order.
pub fn update_neighborhood<R: Rng + ?Sized>(
    cells: &mut Raster<Cell>,
    side: usize,
    perturbation_degree: f64,
    rng: &mut R,
) {
    let snapshot: &Raster<Cell> = cells;
    let means: Vec<f64> = snapshot
        .positions()
        .map(|pos| neighborhood_mean(snapshot, pos, side))
        .collect();

    for (idx, mean) in means.into_iter().enumerate() {
        let draw: f64 = rng.sample(Open01);
        let pos = cells.pos_of(idx);
        if let Some(cell) = cells.get_mut(pos) {
            cell.neighborhood_mean = mean;
            cell.perturbation_draw = draw;
            cell.resistance = resistance(draw, perturbation_degree);
            cell.development_probability = development_probability(cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn raster(width: usize, height: usize, urban: &[(usize, usize)], water: &[(usize, usize)]) -> Raster<Cell> {
        let cells = (0..width * height)
            .map(|idx| {
                let pos = CellPos::new(idx % width, idx / width);
                let key = (pos.i, pos.j);
                Cell::new(
                    pos,
                    point!(x: 0.0, y: 0.0),
                    !water.contains(&key),
                    0.5,
                    [0.0; 8],
                    urban.contains(&key),
                )
            })
            .collect();
        Raster::from_vec(width, height, cells)
    }

    #[test]
    fn test_mean_excludes_center() {
        let cells = raster(3, 3, &[(1, 1)], &[]);
        assert_eq!(neighborhood_mean(&cells, CellPos::new(1, 1), 3), 0.0);
        assert_eq!(neighborhood_mean(&cells, CellPos::new(0, 0), 3), 1.0 / 3.0);
    }

    #[test]
    fn test_mean_clamps_to_bounds() {
        let cells = raster(3, 3, &[(0, 1), (1, 0)], &[]);
        // corner has three in-bounds neighbors, two of them urban
        assert!((neighborhood_mean(&cells, CellPos::new(0, 0), 3) - 2.0 / 3.0).abs() < 1e-12);
        // window far larger than the grid
        assert!((neighborhood_mean(&cells, CellPos::new(2, 2), 9) - 2.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_huge_window_is_clamped_to_grid() {
        let cells = raster(2, 2, &[(1, 0)], &[]);
        let expected = neighborhood_mean(&cells, CellPos::new(0, 0), 3);
        assert!((expected - 1.0 / 3.0).abs() < 1e-12);
        for side in [20_001, 2_000_001, usize::MAX] {
            assert_eq!(neighborhood_mean(&cells, CellPos::new(0, 0), side), expected);
        }
        assert_eq!(window_urban_fraction(&cells, CellPos::new(1, 1), usize::MAX), 1.0 / 3.0);
    }

    #[test]
    fn test_single_cell_has_no_neighbors() {
        let cells = raster(1, 1, &[(0, 0)], &[]);
        assert_eq!(neighborhood_mean(&cells, CellPos::new(0, 0), 3), 0.0);
    }

    #[test]
    fn test_resistance_at_p_one() {
        let r: f64 = 0.25;
        assert!((resistance(r, 1.0) - (1.0 - r.ln())).abs() < 1e-12);
        assert!(resistance(1.0 - 1e-12, 2.0) >= 1.0);
    }

    #[test]
    fn test_water_never_develops() {
        let mut cells = raster(4, 4, &[(0, 0), (1, 1)], &[(2, 2), (3, 3)]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        update_neighborhood(&mut cells, 3, 1.0, &mut rng);
        for cell in cells.values() {
            if cell.is_land() {
                assert!(cell.development_probability > 0.0);
                assert!(cell.development_probability <= 1.0);
            } else {
                assert_eq!(cell.development_probability, 0.0);
            }
            assert!(cell.perturbation_draw > 0.0 && cell.perturbation_draw < 1.0);
            assert!(cell.resistance >= 1.0);
        }
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = raster(3, 2, &[], &[]);
        let mut b = raster(3, 2, &[], &[]);
        update_neighborhood(&mut a, 3, 1.5, &mut ChaCha8Rng::seed_from_u64(7));
        update_neighborhood(&mut b, 3, 1.5, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
