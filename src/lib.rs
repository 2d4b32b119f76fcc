//! Deterministic agro-forestry scheme simulator.
//!
//! A validated [`Scenario`] is run through tree growth, a four-stage
//! processing chain (logistics, extraction, substrate, plates), a soil-carbon
//! end-of-life model, a cross-stage join with derived KPIs and finally an
//! economics engine (NPV, IRR, payback). Every stage is a pure function of
//! its inputs; [`Pipeline::run`] returns the complete result.

pub mod aggregate;
pub mod economics;
pub mod eol;
pub mod export;
pub mod growth;
pub mod pipeline;
pub mod processing;
pub mod scenario;
pub mod sensitivity;
pub mod series;

pub use aggregate::{JoinedDataset, Kpis};
pub use economics::{EconomicResult, Irr};
pub use pipeline::{Pipeline, SimulationResult, StageId};
pub use scenario::{Scenario, ScenarioError, ScenarioParams, ValidationError};
pub use series::{Year, YearlySeries};
