//! Pipeline module for running a scenario through every simulation stage.
//!
//! A run is a single call returning a complete [`SimulationResult`]; no
//! state outlives it.

mod stage;

pub use stage::{Pipeline, SimulationResult, StageId};
