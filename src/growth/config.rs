//! Growth parameters.

use serde::{Deserialize, Serialize};

use crate::scenario::validate::{self, ValidationError};
use crate::series::Year;

/// Earliest planting or harvest year accepted.
pub const MIN_YEAR: Year = 0;
/// Latest planting or harvest year accepted.
pub const MAX_YEAR: Year = 9_999;
/// Longest planting-to-harvest horizon, counting both ends.
pub const MAX_GROWTH_YEARS: u32 = 100;

/// Bounded per-tree biomass curve, evaluated on stand age in years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthCurve {
    /// `max / (1 + exp(-k (age - inflection_age)))`
    Logistic { growth_rate: f64, inflection_age: f64 },
    /// `max * exp(-displacement * exp(-k age))`
    Gompertz { growth_rate: f64, displacement: f64 },
}

impl Default for GrowthCurve {
    fn default() -> Self {
        Self::Logistic {
            growth_rate: 0.45,
            inflection_age: 6.0,
        }
    }
}

impl GrowthCurve {
    /// Fraction of the asymptotic maximum reached at `age` (in `[0, 1)`).
    pub fn fraction_at(&self, age: f64) -> f64 {
        match *self {
            GrowthCurve::Logistic { growth_rate, inflection_age } => {
                1.0 / (1.0 + (-growth_rate * (age - inflection_age)).exp())
            }
            GrowthCurve::Gompertz { growth_rate, displacement } => {
                (-displacement * (-growth_rate * age).exp()).exp()
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            GrowthCurve::Logistic { growth_rate, inflection_age } => {
                validate::in_range("growth.curve.growth_rate", growth_rate, 1e-6, 5.0)?;
                validate::in_range("growth.curve.inflection_age", inflection_age, 0.0, 200.0)
            }
            GrowthCurve::Gompertz { growth_rate, displacement } => {
                validate::in_range("growth.curve.growth_rate", growth_rate, 1e-6, 5.0)?;
                validate::in_range("growth.curve.displacement", displacement, 1e-6, 50.0)
            }
        }
    }
}

/// One linear piece of the yearly CO₂ fixation curve, on stand age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixationSegment {
    pub start_age: f64,
    /// Exclusive.
    pub end_age: f64,
    pub start_kg_per_tree: f64,
    pub end_kg_per_tree: f64,
}

/// Yearly CO₂ fixed per tree (kg) at `age`, interpolated within its segment.
///
/// Ages past the last segment keep its end value; an empty curve fixes nothing.
pub fn fixation_kg_per_tree(segments: &[FixationSegment], age: f64) -> f64 {
    for s in segments {
        if s.start_age <= age && age < s.end_age {
            let t = (age - s.start_age) / (s.end_age - s.start_age);
            return s.start_kg_per_tree + t * (s.end_kg_per_tree - s.start_kg_per_tree);
        }
    }
    segments.last().map_or(0.0, |s| s.end_kg_per_tree)
}

fn default_fixation_curve() -> Vec<FixationSegment> {
    vec![
        FixationSegment { start_age: 0.0, end_age: 1.0, start_kg_per_tree: 0.36, end_kg_per_tree: 0.36 },
        FixationSegment { start_age: 1.0, end_age: 4.0, start_kg_per_tree: 0.36, end_kg_per_tree: 4.54 },
        FixationSegment { start_age: 4.0, end_age: 49.0, start_kg_per_tree: 5.0, end_kg_per_tree: 5.0 },
    ]
}

/// Parameters for the plantation growth simulation.
///
/// Units:
/// - biomass: kg dry matter per tree, tonnes for stand totals
/// - costs: currency units (EUR in the presets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthParams {
    pub planting_year: Year,
    pub harvest_year: Year,

    /// Trees planted in the planting year.
    pub initial_trees: f64,
    /// Trees per hectare; sets the planted area.
    pub planting_density_per_ha: f64,
    /// Fraction of trees surviving each year (0-1).
    pub survival_rate: f64,

    pub curve: GrowthCurve,
    /// Asymptotic dry biomass per tree (kg).
    pub max_biomass_per_tree_kg: f64,

    // Partition of total biomass; must sum to 1.
    pub above_ground_fraction: f64,
    pub below_ground_fraction: f64,

    /// CO₂ fixed by each standing tree per year.
    pub co2_fixation: Vec<FixationSegment>,
    /// Price of a fixation credit per tonne CO₂.
    pub co2_price_per_tonne: f64,

    // Plantation costs
    pub seedling_price_per_tree: f64,
    pub maintenance_cost_per_ha_year: f64,
    pub water_m3_per_ha_year: f64,
    pub water_price_per_m3: f64,
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self {
            planting_year: 2025,
            harvest_year: 2037,

            initial_trees: 5000.0,
            planting_density_per_ha: 500.0,
            survival_rate: 0.98,

            curve: GrowthCurve::default(),
            max_biomass_per_tree_kg: 450.0,

            above_ground_fraction: 0.75,
            below_ground_fraction: 0.25,

            co2_fixation: default_fixation_curve(),
            co2_price_per_tonne: 45.0,

            seedling_price_per_tree: 9.10,
            maintenance_cost_per_ha_year: 150.0,
            water_m3_per_ha_year: 760.0,
            water_price_per_m3: 1.20,
        }
    }
}

impl GrowthParams {
    /// Planted area in hectares.
    pub fn planted_area_ha(&self) -> f64 {
        self.initial_trees / self.planting_density_per_ha
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::in_range("growth.planting_year", self.planting_year as f64, MIN_YEAR as f64, MAX_YEAR as f64)?;
        validate::in_range("growth.harvest_year", self.harvest_year as f64, MIN_YEAR as f64, MAX_YEAR as f64)?;
        if self.harvest_year < self.planting_year {
            return Err(ValidationError::HarvestBeforePlanting {
                planting: self.planting_year,
                harvest: self.harvest_year,
            });
        }
        let years = i64::from(self.harvest_year) - i64::from(self.planting_year) + 1;
        if years > i64::from(MAX_GROWTH_YEARS) {
            return Err(ValidationError::HorizonTooLong {
                field: "growth.harvest_year",
                years,
                max: MAX_GROWTH_YEARS,
            });
        }
        validate::in_range("growth.initial_trees", self.initial_trees, 1.0, 1e9)?;
        validate::in_range("growth.planting_density_per_ha", self.planting_density_per_ha, 1.0, 10_000.0)?;
        validate::unit_interval("growth.survival_rate", self.survival_rate)?;
        self.curve.validate()?;
        validate::in_range("growth.max_biomass_per_tree_kg", self.max_biomass_per_tree_kg, 1e-3, 100_000.0)?;
        validate::proportions(
            "growth.biomass_partition",
            &[
                ("growth.above_ground_fraction", self.above_ground_fraction),
                ("growth.below_ground_fraction", self.below_ground_fraction),
            ],
        )?;
        for segment in &self.co2_fixation {
            validate::in_range("growth.co2_fixation.start_age", segment.start_age, 0.0, 200.0)?;
            validate::in_range("growth.co2_fixation.end_age", segment.end_age, segment.start_age, 200.0)?;
            validate::non_negative("growth.co2_fixation.start_kg_per_tree", segment.start_kg_per_tree, 1_000.0)?;
            validate::non_negative("growth.co2_fixation.end_kg_per_tree", segment.end_kg_per_tree, 1_000.0)?;
        }
        validate::non_negative("growth.co2_price_per_tonne", self.co2_price_per_tonne, 1_000.0)?;
        validate::non_negative("growth.seedling_price_per_tree", self.seedling_price_per_tree, 1_000.0)?;
        validate::non_negative("growth.maintenance_cost_per_ha_year", self.maintenance_cost_per_ha_year, 1e6)?;
        validate::non_negative("growth.water_m3_per_ha_year", self.water_m3_per_ha_year, 1e5)?;
        validate::non_negative("growth.water_price_per_m3", self.water_price_per_m3, 1_000.0)
    }
}
