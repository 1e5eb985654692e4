//! Per-iteration segmentation of the grid
//!
//! Every cell gets a brightness (the mean of its perturbation draw,
//! development probability, neighborhood mean and suitability), the field is
//! smoothed with a 3x3 Gaussian, and a [`Segmenter`] partitions the result.
//! The default [`SeededWatershed`] floods outward from random markers.
//!
//! Whatever the segmenter, the outcome is a partition: every cell carries
//! exactly one [`SegmentId`], ids are dense from 1, and no segment is empty.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rand::{Rng, RngCore};

use crate::core::types::{CellPos, SegmentId};
use crate::landscape::Cell;
use crate::spatial::raster::Raster;

/// Label for cells not yet reached by any region
pub const UNLABELED: u32 = 0;

/// Tie-break order for boundary cells: right, up, down, left
const BOUNDARY_ORDER: [(isize, isize); 4] = [(1, 0), (0, -1), (0, 1), (-1, 0)];

const AXIS_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// A connected group of cells that share one growth decision this iteration
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    /// Member cells in row-major order
    pub cells: Vec<CellPos>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Partitions a brightness field into labeled regions
///
/// Implementations return one label per cell. Any non-zero `u32` is a region;
/// [`UNLABELED`] marks cells the caller must treat as unassigned.
pub trait Segmenter {
    fn label(&self, brightness: &Raster<f64>, rng: &mut dyn RngCore) -> Raster<u32>;
}

/// Marker-seeded watershed flooding
///
/// Places `floor((width * height)^degree)` markers at uniformly random cells
/// (later markers overwrite earlier ones on the same cell), then grows regions
/// in order of brightness difference. Cells where two regions meet become
/// boundaries and inherit the first labeled 4-neighbor, checking right, up,
/// down, then left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeededWatershed {
    pub degree: f64,
}

impl SeededWatershed {
    pub fn new(degree: f64) -> Self {
        Self { degree }
    }

    pub fn marker_count(&self, cells: usize) -> usize {
        (cells as f64).powf(self.degree).floor() as usize
    }
}

#[derive(Debug, PartialEq, Eq)]
struct FloodEntry {
    cost: OrderedFloat<f64>,
    /// Insertion order breaks cost ties first-in first-out
    seq: u64,
    index: usize,
}

impl Ord for FloodEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FloodEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Provisional label of a cell claimed by two regions
const BOUNDARY: u32 = u32::MAX;

impl Segmenter for SeededWatershed {
    fn label(&self, brightness: &Raster<f64>, rng: &mut dyn RngCore) -> Raster<u32> {
        let (width, height) = (brightness.width, brightness.height);
        let mut labels = Raster::new(width, height, UNLABELED);
        if brightness.is_empty() {
            return labels;
        }

        let markers = self.marker_count(brightness.len());
        for k in 0..markers {
            let pos = CellPos::new(rng.gen_range(0..width), rng.gen_range(0..height));
            labels.set(pos, k as u32 + 1);
        }

        let mut queued = vec![false; brightness.len()];
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;
        for idx in 0..labels.len() {
            if labels.values()[idx] != UNLABELED {
                enqueue_neighbors(brightness, &labels, &mut heap, &mut queued, &mut seq, idx);
            }
        }

        while let Some(entry) = heap.pop() {
            let pos = labels.pos_of(entry.index);
            let mut claimed = UNLABELED;
            let mut conflict = false;
            for (di, dj) in AXIS_OFFSETS {
                let Some(n) = pos.offset(di, dj, width, height) else {
                    continue;
                };
                let label = *labels.get(n).unwrap_or(&UNLABELED);
                if label == UNLABELED || label == BOUNDARY {
                    continue;
                }
                if claimed == UNLABELED {
                    claimed = label;
                } else if claimed != label {
                    conflict = true;
                }
            }

            if conflict {
                labels.set(pos, BOUNDARY);
            } else if claimed != UNLABELED {
                labels.set(pos, claimed);
                enqueue_neighbors(brightness, &labels, &mut heap, &mut queued, &mut seq, entry.index);
            }
        }

        resolve_boundaries(&mut labels);
        labels
    }
}

/// Queue the unlabeled 4-neighbors of `idx`, costed by brightness difference
fn enqueue_neighbors(
    brightness: &Raster<f64>,
    labels: &Raster<u32>,
    heap: &mut BinaryHeap<FloodEntry>,
    queued: &mut [bool],
    seq: &mut u64,
    idx: usize,
) {
    let pos = labels.pos_of(idx);
    let here = brightness.values()[idx];
    for (di, dj) in AXIS_OFFSETS {
        let Some(n) = pos.offset(di, dj, labels.width, labels.height) else {
            continue;
        };
        let n_idx = labels.index_of(n);
        if queued[n_idx] || labels.values()[n_idx] != UNLABELED {
            continue;
        }
        queued[n_idx] = true;
        heap.push(FloodEntry {
            cost: OrderedFloat((brightness.values()[n_idx] - here).abs()),
            seq: *seq,
            index: n_idx,
        });
        *seq += 1;
    }
}

/// Give every unresolved cell (boundary or unreached) the label of its first
/// labeled 4-neighbor, in right/up/down/left order
///
/// Passes repeat until nothing changes, so cells surrounded only by other
/// unresolved cells pick up labels as the resolved front moves inward.
fn resolve_boundaries(labels: &mut Raster<u32>) {
    let is_resolved = |label: u32| label != UNLABELED && label != BOUNDARY;
    loop {
        let mut changed = false;
        let mut pending = false;
        for idx in 0..labels.len() {
            if is_resolved(labels.values()[idx]) {
                continue;
            }
            let pos = labels.pos_of(idx);
            let inherited = BOUNDARY_ORDER.iter().find_map(|&(di, dj)| {
                let n = pos.offset(di, dj, labels.width, labels.height)?;
                let label = *labels.get(n)?;
                is_resolved(label).then_some(label)
            });
            match inherited {
                Some(label) => {
                    labels.set(pos, label);
                    changed = true;
                }
                None => pending = true,
            }
        }
        if !pending || !changed {
            break;
        }
    }
    for label in labels.values_mut().iter_mut() {
        if *label == BOUNDARY {
            *label = UNLABELED;
        }
    }
}

/// Dense segments from a label raster
///
/// Labels are renumbered 1..=n in order of first appearance in a row-major
/// scan. If any cell is left unlabeled (including the case of no regions at
/// all) the whole grid collapses to a single segment.
pub fn compact_segments(labels: &Raster<u32>) -> (Raster<SegmentId>, Vec<Segment>) {
    let (width, height) = (labels.width, labels.height);
    if labels.values().iter().any(|&l| l == UNLABELED) {
        tracing::debug!("Segmentation left cells unlabeled, using one segment");
        let ids = Raster::new(width, height, SegmentId(1));
        let segment = Segment {
            id: SegmentId(1),
            cells: labels.positions().collect(),
        };
        return (ids, vec![segment]);
    }

    let mut remap: ahash::AHashMap<u32, SegmentId> = ahash::AHashMap::new();
    let mut segments: Vec<Segment> = Vec::new();
    let mut ids = Vec::with_capacity(labels.len());
    for (pos, &label) in labels.positions().zip(labels.values()) {
        let id = *remap.entry(label).or_insert_with(|| {
            let id = SegmentId(segments.len() as u32 + 1);
            segments.push(Segment {
                id,
                cells: Vec::new(),
            });
            id
        });
        segments[(id.0 - 1) as usize].cells.push(pos);
        ids.push(id);
    }
    (Raster::from_vec(width, height, ids), segments)
}

/// Smoothed brightness field of the current cell state
pub fn brightness_field(cells: &Raster<Cell>) -> Raster<f64> {
    let values = cells.values().iter().map(Cell::brightness).collect();
    Raster::from_vec(cells.width, cells.height, values).gaussian_blur_3x3()
}

/// Segment the grid and record each cell's segment
pub fn segment_cells(
    cells: &mut Raster<Cell>,
    segmenter: &dyn Segmenter,
    rng: &mut dyn RngCore,
) -> Vec<Segment> {
    let brightness = brightness_field(cells);
    let labels = segmenter.label(&brightness, rng);
    let (ids, segments) = compact_segments(&labels);
    for (cell, &id) in cells.values_mut().iter_mut().zip(ids.values()) {
        cell.segment = Some(id);
    }
    debug_assert!(segments.iter().all(|s| !s.is_empty()));
    segments
}
