//! Per-iteration growth phases and the orchestrator that runs them

pub mod growth;
pub mod neighborhood;
pub mod segmentation;
pub mod tick;

pub use growth::{GrowthRegime, GrowthReport, SegmentStats};
pub use segmentation::{SeededWatershed, Segment, Segmenter};
pub use tick::{advance, advance_with, SimRng, Simulation};
