//! Urban Growth - stochastic cellular-automaton model of urban expansion
//!
//! A landscape grid is built once from geographic feature collections
//! (roads, rails, settlements, water, buildings, land use). Each iteration
//! then perturbs development probabilities, segments the grid and lets
//! segments grow organically or spontaneously.

pub mod core;
pub mod features;
pub mod landscape;
pub mod simulation;
pub mod spatial;

pub use crate::core::{GrowthError, Result, SimulationConfig};
pub use crate::features::{Dataset, Feature, FeatureStore};
pub use crate::landscape::{build_grid, Cell, Grid, GridSummary};
pub use crate::simulation::{advance, Simulation};
