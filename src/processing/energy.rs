//! Electricity pricing and grid emissions shared by the processing stages.

use serde::{Deserialize, Serialize};

use crate::scenario::validate::{self, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyParams {
    pub electricity_price_per_kwh: f64,
    /// Scope-2 emission factor of grid electricity (kg CO2e/kWh).
    pub grid_emission_kg_per_kwh: f64,
    /// Share of electricity from on-site renewables (0-1); carries no emissions.
    pub renewable_share: f64,
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self {
            electricity_price_per_kwh: 0.15,
            grid_emission_kg_per_kwh: 0.35,
            renewable_share: 0.5,
        }
    }
}

impl EnergyParams {
    pub fn cost(&self, kwh: f64) -> f64 {
        kwh * self.electricity_price_per_kwh
    }

    /// Scope-2 emissions (t CO2e) for `kwh` of consumption.
    pub fn co2_t(&self, kwh: f64) -> f64 {
        (1.0 - self.renewable_share) * kwh * self.grid_emission_kg_per_kwh / 1000.0
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::non_negative("energy.electricity_price_per_kwh", self.electricity_price_per_kwh, 100.0)?;
        validate::non_negative("energy.grid_emission_kg_per_kwh", self.grid_emission_kg_per_kwh, 10.0)?;
        validate::unit_interval("energy.renewable_share", self.renewable_share)
    }
}
