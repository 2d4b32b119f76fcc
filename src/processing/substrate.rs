//! Substrate preparation: fibre is rehydrated, sterilised and inoculated.
//!
//! The mass flow stays on a dry basis so output never exceeds input; the wet
//! mass is reported alongside and drives sterilisation energy and consumables.

use serde::{Deserialize, Serialize};

use super::{EnergyParams, Flow, ProcessingStage, Throughput};
use crate::pipeline::StageId;
use crate::scenario::validate::{self, ValidationError};
use crate::series::{MassFlow, TabularRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateParams {
    /// Fraction of substrate lost to contamination (0-1).
    pub contamination_loss_frac: f64,
    pub capacity_t_per_year: Option<f64>,
    /// Wet mass per unit of dry mass after rehydration.
    pub rehydration_ratio_wet_over_dry: f64,
    pub sterilize_kwh_per_t_wet: f64,
    pub inoculum_cost_per_kg_wet: f64,
    pub additives_cost_per_kg_wet: f64,
}

impl Default for SubstrateParams {
    fn default() -> Self {
        Self {
            contamination_loss_frac: 0.05,
            capacity_t_per_year: None,
            rehydration_ratio_wet_over_dry: 3.7 / 1.1,
            sterilize_kwh_per_t_wet: 4.0,
            inoculum_cost_per_kg_wet: 0.08,
            additives_cost_per_kg_wet: 0.05,
        }
    }
}

impl SubstrateParams {
    pub fn throughput(&self) -> Throughput {
        Throughput::new(1.0 - self.contamination_loss_frac, self.capacity_t_per_year)
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::unit_interval("substrate.contamination_loss_frac", self.contamination_loss_frac)?;
        validate::capacity("substrate.capacity_t_per_year", self.capacity_t_per_year)?;
        validate::in_range("substrate.rehydration_ratio_wet_over_dry", self.rehydration_ratio_wet_over_dry, 1.0, 20.0)?;
        validate::non_negative("substrate.sterilize_kwh_per_t_wet", self.sterilize_kwh_per_t_wet, 1_000.0)?;
        validate::non_negative("substrate.inoculum_cost_per_kg_wet", self.inoculum_cost_per_kg_wet, 100.0)?;
        validate::non_negative("substrate.additives_cost_per_kg_wet", self.additives_cost_per_kg_wet, 100.0)
    }
}

/// Substrate output for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubstrateRecord {
    /// Dry basis: fibre in, usable substrate out.
    pub flow: Flow,
    /// Wet mass of usable substrate.
    pub wet_substrate_t: f64,
    pub energy_kwh: f64,
    pub energy_cost: f64,
    pub energy_co2_t: f64,
    pub inoculum_cost: f64,
    pub additives_cost: f64,
}

impl SubstrateRecord {
    pub fn total_cost(&self) -> f64 {
        self.energy_cost + self.inoculum_cost + self.additives_cost
    }
}

impl MassFlow for SubstrateRecord {
    fn output_t(&self) -> f64 {
        self.flow.output_t
    }
}

impl TabularRecord for SubstrateRecord {
    const COLUMNS: &'static [&'static str] = &[
        "fiber_in_t",
        "dry_substrate_t",
        "over_capacity_t",
        "wet_substrate_t",
        "energy_kwh",
        "energy_cost",
        "energy_co2_t",
        "inoculum_cost",
        "additives_cost",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.flow.input_t,
            self.flow.output_t,
            self.flow.over_capacity_t,
            self.wet_substrate_t,
            self.energy_kwh,
            self.energy_cost,
            self.energy_co2_t,
            self.inoculum_cost,
            self.additives_cost,
        ]
    }
}

pub struct SubstrateStage<'a> {
    pub params: &'a SubstrateParams,
}

impl<'a> SubstrateStage<'a> {
    pub fn new(params: &'a SubstrateParams) -> Self {
        Self { params }
    }
}

impl ProcessingStage for SubstrateStage<'_> {
    type Record = SubstrateRecord;

    fn id(&self) -> StageId {
        StageId::Substrate
    }

    fn throughput(&self) -> Throughput {
        self.params.throughput()
    }

    fn process(&self, flow: Flow, energy: &EnergyParams) -> SubstrateRecord {
        let p = self.params;
        let wet_t = flow.output_t * p.rehydration_ratio_wet_over_dry;
        let energy_kwh = wet_t * p.sterilize_kwh_per_t_wet;

        SubstrateRecord {
            flow,
            wet_substrate_t: wet_t,
            energy_kwh,
            energy_cost: energy.cost(energy_kwh),
            energy_co2_t: energy.co2_t(energy_kwh),
            inoculum_cost: wet_t * 1000.0 * p.inoculum_cost_per_kg_wet,
            additives_cost: wet_t * 1000.0 * p.additives_cost_per_kg_wet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_substrate_wet_mass_and_costs() {
        let params = SubstrateParams {
            contamination_loss_frac: 0.0,
            rehydration_ratio_wet_over_dry: 3.0,
            sterilize_kwh_per_t_wet: 4.0,
            inoculum_cost_per_kg_wet: 0.1,
            additives_cost_per_kg_wet: 0.2,
            capacity_t_per_year: None,
        };
        let energy = EnergyParams {
            electricity_price_per_kwh: 0.5,
            ..Default::default()
        };
        let stage = SubstrateStage::new(&params);
        let record = stage.process(stage.throughput().apply(2.0), &energy);

        assert_relative_eq!(record.wet_substrate_t, 6.0);
        assert_relative_eq!(record.energy_kwh, 24.0);
        assert_relative_eq!(record.energy_cost, 12.0);
        assert_relative_eq!(record.inoculum_cost, 600.0, max_relative = 1e-12);
        assert_relative_eq!(record.additives_cost, 1200.0, max_relative = 1e-12);
    }

    #[test]
    fn test_contamination_reduces_dry_output() {
        let params = SubstrateParams::default();
        let stage = SubstrateStage::new(&params);
        let record = stage.process(stage.throughput().apply(100.0), &EnergyParams::default());
        assert_relative_eq!(record.flow.output_t, 95.0, max_relative = 1e-12);
        assert!(record.wet_substrate_t > record.flow.output_t);
    }
}
