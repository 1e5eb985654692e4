//! Growth selection
//!
//! Ranks this iteration's segments by utility and lets each one grow in one
//! of two regimes, chosen by how urban its surroundings already are:
//!
//! - **Organic**: a single draw against the segment's mean development
//!   probability decides whether the segment's urban edge expands by one
//!   ring of 4-neighbors.
//! - **Spontaneous**: random seeds inside the segment start greedy walks
//!   toward the most suitable neighboring cell, converting cells along the
//!   way with their own development probability.
//!
//! Every conversion is stamped with the iteration that made it.

use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{CellPos, Iteration};
use crate::landscape::Cell;
use crate::simulation::neighborhood::window_urban_fraction;
use crate::simulation::segmentation::Segment;
use crate::spatial::raster::Raster;

const AXIS_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Development-probability statistics of one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStats {
    pub mean: f64,
    pub std_dev: f64,
    /// `w1 * mean - w2 * std_dev`
    pub utility: f64,
}

impl SegmentStats {
    pub fn compute(cells: &Raster<Cell>, segment: &Segment, w_mean: f64, w_std_dev: f64) -> Self {
        let n = segment.len().max(1) as f64;
        let (sum, sum_sq) = segment.cells.iter().fold((0.0, 0.0), |(s, sq), &pos| {
            let dp = cells.values()[cells.index_of(pos)].development_probability;
            (s + dp, sq + dp * dp)
        });
        let mean = sum / n;
        // E[x^2] - E[x]^2 can dip below zero by rounding
        let variance = (sum_sq / n - mean * mean).max(0.0);
        let std_dev = variance.sqrt();
        Self {
            mean,
            std_dev,
            utility: w_mean * mean - w_std_dev * std_dev,
        }
    }
}

/// How a segment grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthRegime {
    Organic,
    Spontaneous,
}

/// Outcome of one growth pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowthReport {
    pub organic_segments: usize,
    pub spontaneous_segments: usize,
    /// Spontaneous segments with no seed above the suitability floor
    pub exhausted_segments: usize,
    pub converted_cells: usize,
}

/// Mean, over the segment, of each cell's urban fraction within `radius`
pub fn local_expansion_index(cells: &Raster<Cell>, segment: &Segment, radius: usize) -> f64 {
    if segment.is_empty() {
        return 0.0;
    }
    let total: f64 = segment
        .cells
        .iter()
        .map(|&pos| window_urban_fraction(cells, pos, radius))
        .sum();
    total / segment.len() as f64
}

/// Organic when the index strictly exceeds the threshold
pub fn classify_regime(lei: f64, threshold: f64) -> GrowthRegime {
    if lei > threshold {
        GrowthRegime::Organic
    } else {
        GrowthRegime::Spontaneous
    }
}

/// Run one growth pass over all segments, highest utility first
pub fn select_growth<R: Rng + ?Sized>(
    cells: &mut Raster<Cell>,
    segments: &[Segment],
    config: &SimulationConfig,
    iteration: Iteration,
    rng: &mut R,
) -> GrowthReport {
    let mut report = GrowthReport::default();
    if segments.is_empty() {
        return report;
    }

    let mut ranked: Vec<(usize, SegmentStats)> = segments
        .iter()
        .enumerate()
        .map(|(k, segment)| {
            let stats = SegmentStats::compute(
                cells,
                segment,
                config.utility_weight_mean,
                config.utility_weight_stddev,
            );
            (k, stats)
        })
        .collect();
    // stable: equal utilities keep segment id order
    ranked.sort_by(|a, b| b.1.utility.total_cmp(&a.1.utility));

    let walk_budget = (cells.len() / segments.len()).max(1);

    for (k, stats) in ranked {
        let segment = &segments[k];
        let lei = local_expansion_index(cells, segment, config.lei_radius);
        let regime = classify_regime(lei, config.organic_threshold);
        let converted = match regime {
            GrowthRegime::Organic => {
                report.organic_segments += 1;
                grow_organic(cells, segment, stats.mean, iteration, rng)
            }
            GrowthRegime::Spontaneous => {
                report.spontaneous_segments += 1;
                match grow_spontaneous(cells, segment, config, walk_budget, iteration, rng) {
                    Some(n) => n,
                    None => {
                        report.exhausted_segments += 1;
                        0
                    }
                }
            }
        };
        tracing::trace!(
            segment = segment.id.0,
            cells = segment.len(),
            utility = stats.utility,
            lei,
            ?regime,
            converted,
            "Segment grown"
        );
        report.converted_cells += converted;
    }

    report
}

/// Expand the segment's urban edge by one 4-neighbor ring
///
/// Eligibility is judged against the urban state before this pass, so the
/// expansion never chains through cells converted in the same pass.
fn grow_organic<R: Rng + ?Sized>(
    cells: &mut Raster<Cell>,
    segment: &Segment,
    mean_probability: f64,
    iteration: Iteration,
    rng: &mut R,
) -> usize {
    let draw: f64 = rng.gen();
    if draw > mean_probability {
        return 0;
    }

    let snapshot: &Raster<Cell> = cells;
    let eligible: Vec<CellPos> = segment
        .cells
        .iter()
        .copied()
        .filter(|&pos| {
            let cell = &snapshot.values()[snapshot.index_of(pos)];
            cell.is_developable()
                && AXIS_OFFSETS.iter().any(|&(di, dj)| {
                    pos.offset(di, dj, snapshot.width, snapshot.height)
                        .and_then(|n| snapshot.get(n))
                        .is_some_and(|n| n.segment == cell.segment && n.is_urban())
                })
        })
        .collect();

    eligible
        .into_iter()
        .filter(|&pos| cells.get_mut(pos).is_some_and(|c| c.mark_urban(iteration)))
        .count()
}

/// Seeded greedy walks sharing one step budget
///
/// Returns `None` when no cell of the segment is developable with a
/// suitability at or above the floor.
fn grow_spontaneous<R: Rng + ?Sized>(
    cells: &mut Raster<Cell>,
    segment: &Segment,
    config: &SimulationConfig,
    budget: usize,
    iteration: Iteration,
    rng: &mut R,
) -> Option<usize> {
    let candidates: Vec<CellPos> = segment
        .cells
        .iter()
        .copied()
        .filter(|&pos| {
            let cell = &cells.values()[cells.index_of(pos)];
            cell.is_developable() && cell.suitability() >= config.spontaneous_suitability_floor
        })
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let mut steps = 0;
    let mut converted = 0;
    for _ in 0..segment.len() {
        if steps >= budget {
            break;
        }
        let seed = candidates[rng.gen_range(0..candidates.len())];
        if !cells.get(seed).is_some_and(Cell::is_developable) {
            continue;
        }

        let mut current = seed;
        while steps < budget {
            let draw: f64 = rng.gen();
            if let Some(cell) = cells.get_mut(current) {
                if draw < cell.development_probability && cell.mark_urban(iteration) {
                    converted += 1;
                }
            }
            steps += 1;
            match best_neighbor(cells, current) {
                Some(next) => current = next,
                None => break,
            }
        }
    }
    Some(converted)
}

/// Most suitable developable 8-neighbor in the same segment
///
/// Ties go to the first neighbor in row-major order.
fn best_neighbor(cells: &Raster<Cell>, pos: CellPos) -> Option<CellPos> {
    let segment = cells.get(pos)?.segment;
    let mut best: Option<(CellPos, f64)> = None;
    for dj in -1..=1 {
        for di in -1..=1 {
            if di == 0 && dj == 0 {
                continue;
            }
            let Some(n) = pos.offset(di, dj, cells.width, cells.height) else {
                continue;
            };
            let Some(cell) = cells.get(n) else {
                continue;
            };
            if cell.segment != segment || !cell.is_developable() {
                continue;
            }
            if best.map_or(true, |(_, s)| cell.suitability() > s) {
                best = Some((n, cell.suitability()));
            }
        }
    }
    best.map(|(n, _)| n)
}
