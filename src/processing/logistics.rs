//! Inbound logistics: hauling harvested biomass to the processing site.

use serde::{Deserialize, Serialize};

use super::{EnergyParams, Flow, ProcessingStage, Throughput};
use crate::pipeline::StageId;
use crate::scenario::validate::{self, ValidationError};
use crate::series::{MassFlow, TabularRecord};

/// Parameters for inbound transport.
///
/// Distances in km, payloads in tonnes, costs per km of travel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsParams {
    /// Fraction of material lost during loading and unloading (0-1).
    pub loading_loss_frac: f64,
    /// Maximum delivered mass per year (t).
    pub capacity_t_per_year: Option<f64>,
    pub trailer_payload_t: f64,
    pub transport_distance_km: f64,
    pub transport_cost_per_km: f64,
    /// Fraction of distance cost recovered through backhaul loads (0-1).
    pub backhaul_utilization: f64,
    pub truck_emission_kg_per_tkm: f64,
}

impl Default for LogisticsParams {
    fn default() -> Self {
        Self {
            loading_loss_frac: 0.02,
            capacity_t_per_year: None,
            trailer_payload_t: 20.0,
            transport_distance_km: 80.0,
            transport_cost_per_km: 1.5,
            backhaul_utilization: 0.0,
            truck_emission_kg_per_tkm: 0.1,
        }
    }
}

impl LogisticsParams {
    pub fn throughput(&self) -> Throughput {
        Throughput::new(1.0 - self.loading_loss_frac, self.capacity_t_per_year)
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::unit_interval("logistics.loading_loss_frac", self.loading_loss_frac)?;
        validate::capacity("logistics.capacity_t_per_year", self.capacity_t_per_year)?;
        validate::in_range("logistics.trailer_payload_t", self.trailer_payload_t, 0.1, 100.0)?;
        validate::in_range("logistics.transport_distance_km", self.transport_distance_km, 0.0, 10_000.0)?;
        validate::non_negative("logistics.transport_cost_per_km", self.transport_cost_per_km, 1_000.0)?;
        validate::unit_interval("logistics.backhaul_utilization", self.backhaul_utilization)?;
        validate::non_negative("logistics.truck_emission_kg_per_tkm", self.truck_emission_kg_per_tkm, 100.0)
    }
}

/// Logistics output for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticsRecord {
    pub flow: Flow,
    pub trips: f64,
    pub tonne_km: f64,
    pub transport_cost: f64,
    pub transport_co2_t: f64,
}

impl LogisticsRecord {
    pub fn handling_loss_t(&self) -> f64 {
        self.flow.yield_loss_t()
    }
}

impl MassFlow for LogisticsRecord {
    fn output_t(&self) -> f64 {
        self.flow.output_t
    }
}

impl TabularRecord for LogisticsRecord {
    const COLUMNS: &'static [&'static str] = &[
        "inbound_t",
        "delivered_t",
        "over_capacity_t",
        "handling_loss_t",
        "trips",
        "tonne_km",
        "transport_cost",
        "transport_co2_t",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.flow.input_t,
            self.flow.output_t,
            self.flow.over_capacity_t,
            self.handling_loss_t(),
            self.trips,
            self.tonne_km,
            self.transport_cost,
            self.transport_co2_t,
        ]
    }
}

/// Logistics stage bound to its parameters.
pub struct LogisticsStage<'a> {
    pub params: &'a LogisticsParams,
}

impl<'a> LogisticsStage<'a> {
    pub fn new(params: &'a LogisticsParams) -> Self {
        Self { params }
    }
}

impl ProcessingStage for LogisticsStage<'_> {
    type Record = LogisticsRecord;

    fn id(&self) -> StageId {
        StageId::Logistics
    }

    fn throughput(&self) -> Throughput {
        self.params.throughput()
    }

    fn process(&self, flow: Flow, _energy: &EnergyParams) -> LogisticsRecord {
        let p = self.params;
        let trips = (flow.input_t / p.trailer_payload_t).ceil();
        let tonne_km = flow.input_t * p.transport_distance_km;

        LogisticsRecord {
            flow,
            trips,
            tonne_km,
            transport_cost: p.transport_distance_km
                * p.transport_cost_per_km
                * trips
                * (1.0 - p.backhaul_utilization),
            transport_co2_t: p.truck_emission_kg_per_tkm * tonne_km / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_logistics_calculation() {
        let params = LogisticsParams {
            trailer_payload_t: 10.0,
            transport_distance_km: 100.0,
            transport_cost_per_km: 2.0,
            backhaul_utilization: 0.5,
            truck_emission_kg_per_tkm: 0.1,
            loading_loss_frac: 0.1,
            capacity_t_per_year: None,
        };
        let stage = LogisticsStage::new(&params);
        let record = stage.process(stage.throughput().apply(25.0), &EnergyParams::default());

        assert_eq!(record.trips, 3.0);
        assert_relative_eq!(record.tonne_km, 2500.0);
        // 100 km * 2 per km * 3 trips * 0.5 backhaul
        assert_relative_eq!(record.transport_cost, 300.0);
        assert_relative_eq!(record.transport_co2_t, 0.25);
        assert_relative_eq!(record.handling_loss_t(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(record.flow.output_t, 22.5);
    }

    #[test]
    fn test_no_trips_without_material() {
        let params = LogisticsParams::default();
        let stage = LogisticsStage::new(&params);
        let record = stage.process(stage.throughput().apply(0.0), &EnergyParams::default());
        assert_eq!(record, LogisticsRecord::default());
    }

    #[test]
    fn test_capacity_limits_delivery() {
        let params = LogisticsParams {
            loading_loss_frac: 0.0,
            capacity_t_per_year: Some(100.0),
            ..Default::default()
        };
        let stage = LogisticsStage::new(&params);
        let record = stage.process(stage.throughput().apply(250.0), &EnergyParams::default());
        assert_eq!(record.flow.output_t, 100.0);
        assert_eq!(record.flow.over_capacity_t, 150.0);
        assert_eq!(record.handling_loss_t(), 0.0);
    }
}
