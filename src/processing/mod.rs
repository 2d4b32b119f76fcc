//! Processing chain: logistics, extraction, substrate and plate manufacture.
//!
//! Every stage is a pure transform of the previous stage's yearly mass flow.
//! A stage applies its yield factor, then its optional capacity cap, and
//! derives energy, cost, revenue and emission columns from the resulting
//! [`Flow`]. Year keys pass through unchanged.

mod energy;
pub mod extraction;
mod labor;
pub mod logistics;
pub mod plates;
pub mod substrate;

pub use energy::EnergyParams;
pub use extraction::{ExtractionParams, ExtractionRecord, ExtractionStage};
pub use labor::LaborParams;
pub use logistics::{LogisticsParams, LogisticsRecord, LogisticsStage};
pub use plates::{EndUseAllocation, PlateParams, PlatesRecord, PlatesStage};
pub use substrate::{SubstrateParams, SubstrateRecord, SubstrateStage};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::StageId;
use crate::series::{MassFlow, TabularRecord, YearlySeries};

/// Yield and capacity limits of a processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    /// Fraction of input mass that leaves the stage as output (0-1).
    pub yield_factor: f64,
    /// Maximum output per year (t). `None` means unlimited.
    pub capacity_t_per_year: Option<f64>,
}

impl Throughput {
    pub fn new(yield_factor: f64, capacity_t_per_year: Option<f64>) -> Self {
        Self { yield_factor, capacity_t_per_year }
    }

    /// `min(capacity, input * yield)`, with the capped-off remainder reported.
    pub fn apply(&self, input_t: f64) -> Flow {
        if input_t <= 0.0 {
            return Flow::default();
        }
        let potential = input_t * self.yield_factor;
        let output_t = match self.capacity_t_per_year {
            Some(cap) => potential.min(cap),
            None => potential,
        };
        Flow {
            input_t,
            output_t,
            over_capacity_t: potential - output_t,
        }
    }
}

/// Mass balance of one stage in one year (tonnes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub input_t: f64,
    pub output_t: f64,
    /// Mass that passed the yield step but exceeded the capacity cap.
    pub over_capacity_t: f64,
}

impl Flow {
    /// Mass lost to the yield factor.
    pub fn yield_loss_t(&self) -> f64 {
        (self.input_t - self.output_t - self.over_capacity_t).max(0.0)
    }
}

/// A single transform in the processing chain.
pub trait ProcessingStage {
    type Record: MassFlow + TabularRecord;

    /// Returns the identifier of this stage.
    fn id(&self) -> StageId;

    /// Returns the yield/capacity limits applied to incoming mass.
    fn throughput(&self) -> Throughput;

    /// Derives the full stage record for one year from its mass balance.
    fn process(&self, flow: Flow, energy: &EnergyParams) -> Self::Record;

    /// Runs the stage over every year of the prior stage's output.
    fn run<F: MassFlow>(&self, input: &YearlySeries<F>, energy: &EnergyParams) -> YearlySeries<Self::Record> {
        let throughput = self.throughput();
        let series = input.map(|_, row| self.process(throughput.apply(row.output_t()), energy));
        debug!(
            stage = self.id().name(),
            years = series.len(),
            output_t = series.rows().iter().map(MassFlow::output_t).sum::<f64>(),
            "stage processed"
        );
        series
    }
}
