//! Steam-and-press extraction: biomass in, fibre out, liquid extract as co-product.

use serde::{Deserialize, Serialize};

use super::{EnergyParams, Flow, ProcessingStage, Throughput};
use crate::pipeline::StageId;
use crate::scenario::validate::{self, ValidationError};
use crate::series::{MassFlow, TabularRecord};

/// How the liquid extract is marketed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMarket {
    /// Sold as crude extract by volume.
    #[default]
    Crude,
    /// Purified into oleic acid and theobromine, sold by mass.
    Purified,
}

/// Parameters for the extraction line. Energies are per tonne of input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParams {
    /// Fraction of input mass recovered as fibre (0-1); the main flow.
    pub fiber_yield_frac: f64,
    /// Fraction of input mass recovered as liquid extract (0-1).
    pub extract_yield_frac: f64,
    pub capacity_t_per_year: Option<f64>,

    pub steam_energy_kwh_per_t: f64,
    pub press_energy_kwh_per_t: f64,
    pub line_overhead_kwh_per_t: f64,

    pub extract_density_kg_per_l: f64,
    pub market: ExtractMarket,
    pub price_extract_per_l: f64,

    // Purified route
    pub oleic_frac_in_extract: f64,
    pub theobromine_frac_in_extract: f64,
    pub purification_yield: f64,
    pub price_oleic_per_kg: f64,
    pub price_theobromine_per_kg: f64,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            fiber_yield_frac: 0.55,
            extract_yield_frac: 0.02,
            capacity_t_per_year: None,

            steam_energy_kwh_per_t: 15.0,
            press_energy_kwh_per_t: 8.0,
            line_overhead_kwh_per_t: 5.0,

            extract_density_kg_per_l: 1.0,
            market: ExtractMarket::Crude,
            price_extract_per_l: 4.0,

            oleic_frac_in_extract: 0.35,
            theobromine_frac_in_extract: 0.34,
            purification_yield: 0.90,
            price_oleic_per_kg: 3.6,
            price_theobromine_per_kg: 17.0,
        }
    }
}

impl ExtractionParams {
    pub fn throughput(&self) -> Throughput {
        Throughput::new(self.fiber_yield_frac, self.capacity_t_per_year)
    }

    pub fn energy_kwh_per_t(&self) -> f64 {
        self.steam_energy_kwh_per_t + self.press_energy_kwh_per_t + self.line_overhead_kwh_per_t
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::unit_interval("extraction.fiber_yield_frac", self.fiber_yield_frac)?;
        validate::unit_interval("extraction.extract_yield_frac", self.extract_yield_frac)?;
        validate::in_range(
            "extraction.fiber_plus_extract_yield",
            self.fiber_yield_frac + self.extract_yield_frac,
            0.0,
            1.0,
        )?;
        validate::capacity("extraction.capacity_t_per_year", self.capacity_t_per_year)?;
        validate::non_negative("extraction.steam_energy_kwh_per_t", self.steam_energy_kwh_per_t, 1_000.0)?;
        validate::non_negative("extraction.press_energy_kwh_per_t", self.press_energy_kwh_per_t, 1_000.0)?;
        validate::non_negative("extraction.line_overhead_kwh_per_t", self.line_overhead_kwh_per_t, 1_000.0)?;
        validate::in_range("extraction.extract_density_kg_per_l", self.extract_density_kg_per_l, 0.1, 2.0)?;
        validate::non_negative("extraction.price_extract_per_l", self.price_extract_per_l, 5_000.0)?;
        validate::proportions_at_most_one(
            "extraction.extract_composition",
            &[
                ("extraction.oleic_frac_in_extract", self.oleic_frac_in_extract),
                ("extraction.theobromine_frac_in_extract", self.theobromine_frac_in_extract),
            ],
        )?;
        validate::unit_interval("extraction.purification_yield", self.purification_yield)?;
        validate::non_negative("extraction.price_oleic_per_kg", self.price_oleic_per_kg, 1_000.0)?;
        validate::non_negative("extraction.price_theobromine_per_kg", self.price_theobromine_per_kg, 5_000.0)
    }
}

/// Extraction output for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Input is delivered biomass, output is fibre.
    pub flow: Flow,
    pub extract_t: f64,
    pub extract_l: f64,
    pub energy_kwh: f64,
    pub energy_cost: f64,
    pub energy_co2_t: f64,
    pub extract_revenue: f64,
}

impl MassFlow for ExtractionRecord {
    fn output_t(&self) -> f64 {
        self.flow.output_t
    }
}

impl TabularRecord for ExtractionRecord {
    const COLUMNS: &'static [&'static str] = &[
        "input_t",
        "fiber_t",
        "over_capacity_t",
        "extract_t",
        "extract_l",
        "energy_kwh",
        "energy_cost",
        "energy_co2_t",
        "extract_revenue",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.flow.input_t,
            self.flow.output_t,
            self.flow.over_capacity_t,
            self.extract_t,
            self.extract_l,
            self.energy_kwh,
            self.energy_cost,
            self.energy_co2_t,
            self.extract_revenue,
        ]
    }
}

pub struct ExtractionStage<'a> {
    pub params: &'a ExtractionParams,
}

impl<'a> ExtractionStage<'a> {
    pub fn new(params: &'a ExtractionParams) -> Self {
        Self { params }
    }
}

impl ProcessingStage for ExtractionStage<'_> {
    type Record = ExtractionRecord;

    fn id(&self) -> StageId {
        StageId::Extraction
    }

    fn throughput(&self) -> Throughput {
        self.params.throughput()
    }

    fn process(&self, flow: Flow, energy: &EnergyParams) -> ExtractionRecord {
        let p = self.params;

        // Material beyond capacity never enters the line.
        let processed_t = if flow.over_capacity_t > 0.0 {
            flow.output_t / p.fiber_yield_frac
        } else {
            flow.input_t
        };

        let extract_t = processed_t * p.extract_yield_frac;
        let extract_l = extract_t * 1000.0 / p.extract_density_kg_per_l;
        let energy_kwh = processed_t * p.energy_kwh_per_t();

        let extract_revenue = match p.market {
            ExtractMarket::Crude => extract_l * p.price_extract_per_l,
            ExtractMarket::Purified => {
                let purified_kg = extract_t * 1000.0 * p.purification_yield;
                purified_kg * p.oleic_frac_in_extract * p.price_oleic_per_kg
                    + purified_kg * p.theobromine_frac_in_extract * p.price_theobromine_per_kg
            }
        };

        ExtractionRecord {
            flow,
            extract_t,
            extract_l,
            energy_kwh,
            energy_cost: energy.cost(energy_kwh),
            energy_co2_t: energy.co2_t(energy_kwh),
            extract_revenue,
        }
    }
}
