//! Stage identifiers and pipeline orchestration.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{self, JoinedDataset};
use crate::economics::{self, CashFlowSeries, EconomicResult};
use crate::eol::{self, EolRecord};
use crate::growth::{self, GrowthRecord};
use crate::processing::{
    ExtractionRecord, ExtractionStage, LogisticsRecord, LogisticsStage, PlatesRecord, PlatesStage,
    ProcessingStage, SubstrateRecord, SubstrateStage,
};
use crate::scenario::Scenario;
use crate::series::YearlySeries;

/// Unique identifier for simulation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Tree count and biomass.
    Growth,
    /// Transport to the processing site.
    Logistics,
    /// Fibre and extract separation.
    Extraction,
    /// Substrate preparation.
    Substrate,
    /// Plate manufacture and end-use allocation.
    Plates,
    /// Soil carbon and credits.
    EndOfLife,
    /// Cross-stage join and KPIs.
    Aggregate,
    /// NPV, IRR and payback.
    Economics,
}

impl StageId {
    /// Execution order. Data only flows forward through this list.
    pub const ORDER: [StageId; 8] = [
        StageId::Growth,
        StageId::Logistics,
        StageId::Extraction,
        StageId::Substrate,
        StageId::Plates,
        StageId::EndOfLife,
        StageId::Aggregate,
        StageId::Economics,
    ];

    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Growth => "growth",
            StageId::Logistics => "logistics",
            StageId::Extraction => "extraction",
            StageId::Substrate => "substrate",
            StageId::Plates => "plates",
            StageId::EndOfLife => "end_of_life",
            StageId::Aggregate => "aggregate",
            StageId::Economics => "economics",
        }
    }

    /// Position of the stage in [`StageId::ORDER`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario_name: String,
    pub growth: YearlySeries<GrowthRecord>,
    pub logistics: YearlySeries<LogisticsRecord>,
    pub extraction: YearlySeries<ExtractionRecord>,
    pub substrate: YearlySeries<SubstrateRecord>,
    pub plates: YearlySeries<PlatesRecord>,
    pub eol: YearlySeries<EolRecord>,
    pub dataset: JoinedDataset,
    pub cash_flows: CashFlowSeries,
    pub economics: EconomicResult,
}

impl SimulationResult {
    /// Total plates produced over the run.
    pub fn plates_produced(&self) -> f64 {
        self.plates.rows().iter().map(|p| p.plates).sum()
    }
}

struct Progress<F1, F2> {
    on_stage_start: F1,
    on_stage_complete: F2,
}

impl<F1, F2> Progress<F1, F2>
where
    F1: FnMut(&str, usize, usize),
    F2: FnMut(&str, usize, usize),
{
    fn stage<T>(&mut self, id: StageId, run: impl FnOnce() -> T) -> T {
        let total = StageId::ORDER.len();
        (self.on_stage_start)(id.name(), id.index(), total);
        let out = run();
        (self.on_stage_complete)(id.name(), id.index(), total);
        out
    }
}

/// Runs every stage of a validated scenario in [`StageId::ORDER`].
pub struct Pipeline<'a> {
    scenario: &'a Scenario,
}

impl<'a> Pipeline<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        Self { scenario }
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        StageId::ORDER.len()
    }

    /// Executes all stages in order.
    pub fn run(&self) -> SimulationResult {
        self.run_with_callbacks(|_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages with progress callbacks.
    ///
    /// # Arguments
    /// * `on_stage_start` - Called with `(name, index, total)` when each stage begins
    /// * `on_stage_complete` - Called with `(name, index, total)` when each stage finishes
    pub fn run_with_callbacks<F1, F2>(&self, on_stage_start: F1, on_stage_complete: F2) -> SimulationResult
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let p = self.scenario.params();
        let mut progress = Progress {
            on_stage_start,
            on_stage_complete,
        };

        let growth = progress.stage(StageId::Growth, || growth::simulate(&p.growth));
        let logistics = progress.stage(StageId::Logistics, || {
            LogisticsStage::new(&p.logistics).run(&growth, &p.energy)
        });
        let extraction = progress.stage(StageId::Extraction, || {
            ExtractionStage::new(&p.extraction).run(&logistics, &p.energy)
        });
        let substrate = progress.stage(StageId::Substrate, || {
            SubstrateStage::new(&p.substrate).run(&extraction, &p.energy)
        });
        let plates = progress.stage(StageId::Plates, || {
            PlatesStage::new(&p.plates).run(&substrate, &p.energy)
        });
        let eol = progress.stage(StageId::EndOfLife, || {
            eol::simulate(&eol::soil_inputs(&growth, &plates), &p.eol)
        });
        let dataset = progress.stage(StageId::Aggregate, || {
            aggregate::join(&growth, &logistics, &extraction, &substrate, &plates, &eol)
        });
        let cash_flows = dataset.cash_flows();
        let total_cost = dataset.final_kpis().cumulative_cost;
        let economics = progress.stage(StageId::Economics, || {
            economics::evaluate(&cash_flows, total_cost, &p.economics)
        });

        info!(
            scenario = %p.name,
            years = dataset.len(),
            npv = economics.npv,
            "simulation complete"
        );

        SimulationResult {
            scenario_name: p.name.clone(),
            growth,
            logistics,
            extraction,
            substrate,
            plates,
            eol,
            dataset,
            cash_flows,
            economics,
        }
    }
}
