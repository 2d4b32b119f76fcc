//! Plantation growth simulation.
//!
//! Produces one record per year from planting to harvest (inclusive): the
//! expected number of surviving trees, per-tree biomass from a bounded growth
//! curve, the above/below-ground split, mortality residue and the harvested
//! mass that feeds the processing chain.

mod config;

pub use config::{
    fixation_kg_per_tree, FixationSegment, GrowthCurve, GrowthParams, MAX_GROWTH_YEARS, MAX_YEAR, MIN_YEAR,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::series::{MassFlow, TabularRecord, Year, YearlySeries};

/// Growth output for a single year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    /// Stand age in years (0 in the planting year).
    pub age: f64,
    /// Expected surviving trees (not rounded).
    pub trees: f64,
    pub biomass_per_tree_kg: f64,
    pub total_biomass_t: f64,
    pub above_ground_t: f64,
    pub below_ground_t: f64,
    /// Standing biomass of trees lost since the previous year.
    pub mortality_residue_t: f64,
    /// Mass removed from the stand this year (harvest year only).
    pub harvested_t: f64,
    /// CO₂ fixed by the standing trees this year.
    pub co2_fixed_t: f64,
    pub co2_revenue: f64,
    pub seedling_cost: f64,
    pub maintenance_cost: f64,
    pub water_cost: f64,
}

impl GrowthRecord {
    pub fn total_cost(&self) -> f64 {
        self.seedling_cost + self.maintenance_cost + self.water_cost
    }
}

impl MassFlow for GrowthRecord {
    fn output_t(&self) -> f64 {
        self.harvested_t
    }
}

impl TabularRecord for GrowthRecord {
    const COLUMNS: &'static [&'static str] = &[
        "age",
        "trees",
        "biomass_per_tree_kg",
        "total_biomass_t",
        "above_ground_t",
        "below_ground_t",
        "mortality_residue_t",
        "harvested_t",
        "co2_fixed_t",
        "co2_revenue",
        "seedling_cost",
        "maintenance_cost",
        "water_cost",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.age,
            self.trees,
            self.biomass_per_tree_kg,
            self.total_biomass_t,
            self.above_ground_t,
            self.below_ground_t,
            self.mortality_residue_t,
            self.harvested_t,
            self.co2_fixed_t,
            self.co2_revenue,
            self.seedling_cost,
            self.maintenance_cost,
            self.water_cost,
        ]
    }
}

/// Expected surviving trees after `age` years of geometric decay.
pub fn trees_at(params: &GrowthParams, age: i32) -> f64 {
    (params.initial_trees * params.survival_rate.powi(age)).max(0.0)
}

/// Per-tree dry biomass (kg) at `age`.
pub fn biomass_per_tree_kg(params: &GrowthParams, age: i32) -> f64 {
    params.max_biomass_per_tree_kg * params.curve.fraction_at(age as f64)
}

/// Runs the growth simulation from planting year to harvest year.
///
/// Parameters are assumed validated (see [`crate::scenario::Scenario`]).
pub fn simulate(params: &GrowthParams) -> YearlySeries<GrowthRecord> {
    let area_ha = params.planted_area_ha();

    let series = YearlySeries::from_fn(params.planting_year, params.harvest_year, |year: Year| {
        let age = year - params.planting_year;
        let trees = trees_at(params, age);
        let per_tree_kg = biomass_per_tree_kg(params, age);
        let total_t = trees * per_tree_kg / 1000.0;

        let above_t = total_t * params.above_ground_fraction;
        let below_t = total_t * params.below_ground_fraction;

        let mortality_residue_t = if age == 0 {
            0.0
        } else {
            let lost = (trees_at(params, age - 1) - trees).max(0.0);
            lost * biomass_per_tree_kg(params, age - 1) / 1000.0
        };

        let harvested_t = if year == params.harvest_year { above_t + below_t } else { 0.0 };
        let co2_fixed_t = trees * fixation_kg_per_tree(&params.co2_fixation, age as f64) / 1000.0;

        GrowthRecord {
            age: age as f64,
            trees,
            biomass_per_tree_kg: per_tree_kg,
            total_biomass_t: total_t,
            above_ground_t: above_t,
            below_ground_t: below_t,
            mortality_residue_t,
            harvested_t,
            co2_fixed_t,
            co2_revenue: co2_fixed_t * params.co2_price_per_tonne,
            seedling_cost: if age == 0 {
                params.initial_trees * params.seedling_price_per_tree
            } else {
                0.0
            },
            maintenance_cost: area_ha * params.maintenance_cost_per_ha_year,
            water_cost: area_ha * params.water_m3_per_ha_year * params.water_price_per_m3,
        }
    });

    debug!(
        years = series.len(),
        harvested_t = series.rows().iter().map(|r| r.harvested_t).sum::<f64>(),
        "growth simulated"
    );
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn example_params() -> GrowthParams {
        GrowthParams {
            planting_year: 0,
            harvest_year: 20,
            initial_trees: 1000.0,
            survival_rate: 0.98,
            ..Default::default()
        }
    }

    #[test]
    fn test_tree_count_follows_geometric_survival() {
        let series = simulate(&example_params());
        assert_eq!(series.len(), 21);
        let final_trees = series.get(20).unwrap().trees;
        // 1000 * 0.98^20 = 667.6
        assert_abs_diff_eq!(final_trees, 667.6, epsilon = 0.1);
        assert_eq!(final_trees.round(), 668.0);
    }

    #[test]
    fn test_tree_count_is_non_increasing_and_non_negative() {
        for survival_rate in [0.0, 0.5, 0.9, 1.0] {
            let params = GrowthParams { survival_rate, ..example_params() };
            let series = simulate(&params);
            let mut prev = f64::INFINITY;
            for (_, row) in series.iter() {
                assert!(row.trees >= 0.0);
                assert!(row.trees <= prev);
                prev = row.trees;
            }
        }
    }

    #[test]
    fn test_partition_sums_to_total() {
        let series = simulate(&GrowthParams::default());
        for (_, row) in series.iter() {
            assert_abs_diff_eq!(row.above_ground_t + row.below_ground_t, row.total_biomass_t, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_harvest_only_in_harvest_year() {
        let params = GrowthParams::default();
        let series = simulate(&params);
        for (year, row) in series.iter() {
            if year == params.harvest_year {
                assert_abs_diff_eq!(row.harvested_t, row.total_biomass_t, epsilon = 1e-9);
                assert!(row.harvested_t > 0.0);
            } else {
                assert_eq!(row.harvested_t, 0.0);
            }
        }
    }

    #[test]
    fn test_seedlings_paid_in_planting_year_only() {
        let params = GrowthParams::default();
        let series = simulate(&params);
        let first = series.get(params.planting_year).unwrap();
        assert_abs_diff_eq!(first.seedling_cost, 5000.0 * 9.10, epsilon = 1e-9);
        assert!(series.iter().skip(1).all(|(_, r)| r.seedling_cost == 0.0));
    }

    #[test]
    fn test_mortality_residue_matches_lost_trees() {
        let params = example_params();
        let series = simulate(&params);
        assert_eq!(series.get(0).unwrap().mortality_residue_t, 0.0);

        let lost = trees_at(&params, 4) - trees_at(&params, 5);
        let expected = lost * biomass_per_tree_kg(&params, 4) / 1000.0;
        assert_abs_diff_eq!(series.get(5).unwrap().mortality_residue_t, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_standing_trees_earn_fixation_credits() {
        let params = example_params();
        let series = simulate(&params);

        let planting = series.get(0).unwrap();
        assert_abs_diff_eq!(planting.co2_fixed_t, 1000.0 * 0.36 / 1000.0, epsilon = 1e-12);

        let mature = series.get(10).unwrap();
        assert_abs_diff_eq!(mature.co2_fixed_t, mature.trees * 5.0 / 1000.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mature.co2_revenue, mature.co2_fixed_t * 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_survival_leaves_no_trees_after_planting() {
        let params = GrowthParams { survival_rate: 0.0, ..example_params() };
        let series = simulate(&params);
        assert_eq!(series.get(0).unwrap().trees, 1000.0);
        assert!(series.iter().skip(1).all(|(_, r)| r.trees == 0.0 && r.harvested_t == 0.0));
    }
}
