//! Plate manufacture and end-use allocation of the finished plate mass.

use serde::{Deserialize, Serialize};

use super::{EnergyParams, Flow, LaborParams, ProcessingStage, Throughput};
use crate::pipeline::StageId;
use crate::scenario::validate::{self, ValidationError};
use crate::series::{MassFlow, TabularRecord};

/// Shares of finished plate mass by end use. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndUseAllocation {
    /// Sold as material product.
    pub wood_sale: f64,
    /// Recovered and applied to soil.
    pub compost: f64,
    /// Landfilled.
    pub discard: f64,
}

impl Default for EndUseAllocation {
    fn default() -> Self {
        Self {
            wood_sale: 0.80,
            compost: 0.15,
            discard: 0.05,
        }
    }
}

impl EndUseAllocation {
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::proportions(
            "plates.end_use",
            &[
                ("plates.end_use.wood_sale", self.wood_sale),
                ("plates.end_use.compost", self.compost),
                ("plates.end_use.discard", self.discard),
            ],
        )
    }
}

/// Parameters for plate forming, curing and sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateParams {
    /// Fraction of plates rejected in forming and curing (0-1).
    pub reject_rate: f64,
    pub capacity_t_per_year: Option<f64>,
    pub dry_kg_per_plate: f64,
    pub plate_len_m: f64,
    pub plate_wid_m: f64,
    pub plate_thk_m: f64,
    pub energy_kwh_per_100_plates: f64,
    pub production_cost_per_plate: f64,
    pub plate_price: f64,
    /// Price and cost of an EPS plate of the same volume.
    pub competitor_eps_price: f64,
    pub competitor_eps_cost: f64,
    pub discard_fee_per_t: f64,
    pub end_use: EndUseAllocation,
    pub labor: LaborParams,
}

impl Default for PlateParams {
    fn default() -> Self {
        Self {
            reject_rate: 0.03,
            capacity_t_per_year: None,
            dry_kg_per_plate: 1.1,
            plate_len_m: 1.0,
            plate_wid_m: 1.0,
            plate_thk_m: 0.06,
            energy_kwh_per_100_plates: 4.0,
            production_cost_per_plate: 3.0,
            plate_price: 12.0,
            competitor_eps_price: 12.0,
            competitor_eps_cost: 6.0,
            discard_fee_per_t: 60.0,
            end_use: EndUseAllocation::default(),
            labor: LaborParams::default(),
        }
    }
}

impl PlateParams {
    pub fn throughput(&self) -> Throughput {
        Throughput::new(1.0 - self.reject_rate, self.capacity_t_per_year)
    }

    /// Plate volume in m³.
    pub fn plate_volume_m3(&self) -> f64 {
        self.plate_len_m * self.plate_wid_m * self.plate_thk_m
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::unit_interval("plates.reject_rate", self.reject_rate)?;
        validate::capacity("plates.capacity_t_per_year", self.capacity_t_per_year)?;
        validate::in_range("plates.dry_kg_per_plate", self.dry_kg_per_plate, 0.001, 10_000.0)?;
        validate::in_range("plates.plate_len_m", self.plate_len_m, 0.001, 1_000.0)?;
        validate::in_range("plates.plate_wid_m", self.plate_wid_m, 0.001, 1_000.0)?;
        validate::in_range("plates.plate_thk_m", self.plate_thk_m, 0.001, 1_000.0)?;
        validate::non_negative("plates.energy_kwh_per_100_plates", self.energy_kwh_per_100_plates, 10_000.0)?;
        validate::non_negative("plates.production_cost_per_plate", self.production_cost_per_plate, 1_000.0)?;
        validate::non_negative("plates.plate_price", self.plate_price, 1_000.0)?;
        validate::non_negative("plates.competitor_eps_price", self.competitor_eps_price, 1_000.0)?;
        validate::non_negative("plates.competitor_eps_cost", self.competitor_eps_cost, 1_000.0)?;
        validate::non_negative("plates.discard_fee_per_t", self.discard_fee_per_t, 10_000.0)?;
        self.end_use.validate()?;
        self.labor.validate()
    }
}

/// Plate output for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatesRecord {
    /// Dry substrate in, finished plate mass out.
    pub flow: Flow,
    pub plates: f64,
    pub energy_kwh: f64,
    pub energy_cost: f64,
    pub energy_co2_t: f64,
    pub production_cost: f64,
    pub sold_t: f64,
    pub compost_t: f64,
    pub discard_t: f64,
    pub plates_sold: f64,
    pub plate_revenue: f64,
    pub discard_cost: f64,
    pub plates_composted: f64,
    /// Bulk volume of the composted plates (m³).
    pub compost_volume_m3: f64,
    /// Sales margin on plates sold.
    pub gross_margin: f64,
    /// Margin EPS plates would earn on the same sold volume.
    pub competitor_margin: f64,
    /// Headcount while the plant runs; zero in idle years.
    pub jobs_min_automation: f64,
    pub jobs_dev_mid: f64,
}

impl PlatesRecord {
    pub fn total_cost(&self) -> f64 {
        self.energy_cost + self.production_cost + self.discard_cost
    }
}

impl MassFlow for PlatesRecord {
    fn output_t(&self) -> f64 {
        self.flow.output_t
    }
}

impl TabularRecord for PlatesRecord {
    const COLUMNS: &'static [&'static str] = &[
        "substrate_in_t",
        "plate_mass_t",
        "over_capacity_t",
        "plates",
        "energy_kwh",
        "energy_cost",
        "energy_co2_t",
        "production_cost",
        "sold_t",
        "compost_t",
        "discard_t",
        "plates_sold",
        "plate_revenue",
        "discard_cost",
        "plates_composted",
        "compost_volume_m3",
        "gross_margin",
        "competitor_margin",
        "jobs_min_automation",
        "jobs_dev_mid",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.flow.input_t,
            self.flow.output_t,
            self.flow.over_capacity_t,
            self.plates,
            self.energy_kwh,
            self.energy_cost,
            self.energy_co2_t,
            self.production_cost,
            self.sold_t,
            self.compost_t,
            self.discard_t,
            self.plates_sold,
            self.plate_revenue,
            self.discard_cost,
            self.plates_composted,
            self.compost_volume_m3,
            self.gross_margin,
            self.competitor_margin,
            self.jobs_min_automation,
            self.jobs_dev_mid,
        ]
    }
}

pub struct PlatesStage<'a> {
    pub params: &'a PlateParams,
}

impl<'a> PlatesStage<'a> {
    pub fn new(params: &'a PlateParams) -> Self {
        Self { params }
    }
}

impl ProcessingStage for PlatesStage<'_> {
    type Record = PlatesRecord;

    fn id(&self) -> StageId {
        StageId::Plates
    }

    fn throughput(&self) -> Throughput {
        self.params.throughput()
    }

    fn process(&self, flow: Flow, energy: &EnergyParams) -> PlatesRecord {
        let p = self.params;
        let plates = flow.output_t * 1000.0 / p.dry_kg_per_plate;
        let energy_kwh = plates / 100.0 * p.energy_kwh_per_100_plates;

        let sold_t = flow.output_t * p.end_use.wood_sale;
        let compost_t = flow.output_t * p.end_use.compost;
        let discard_t = flow.output_t * p.end_use.discard;
        let plates_sold = plates * p.end_use.wood_sale;
        let plates_composted = plates * p.end_use.compost;
        let running = flow.output_t > 0.0;

        PlatesRecord {
            flow,
            plates,
            energy_kwh,
            energy_cost: energy.cost(energy_kwh),
            energy_co2_t: energy.co2_t(energy_kwh),
            production_cost: plates * p.production_cost_per_plate,
            sold_t,
            compost_t,
            discard_t,
            plates_sold,
            plate_revenue: plates_sold * p.plate_price,
            discard_cost: discard_t * p.discard_fee_per_t,
            plates_composted,
            compost_volume_m3: plates_composted * p.plate_volume_m3(),
            gross_margin: plates_sold * (p.plate_price - p.production_cost_per_plate),
            competitor_margin: plates_sold * (p.competitor_eps_price - p.competitor_eps_cost),
            jobs_min_automation: if running { p.labor.jobs_min_automation() } else { 0.0 },
            jobs_dev_mid: if running { p.labor.jobs_dev_mid() } else { 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plate_count_and_energy() {
        let params = PlateParams {
            reject_rate: 0.0,
            dry_kg_per_plate: 1.0,
            energy_kwh_per_100_plates: 4.0,
            ..Default::default()
        };
        let energy = EnergyParams {
            renewable_share: 0.1,
            grid_emission_kg_per_kwh: 0.5,
            ..Default::default()
        };
        let stage = PlatesStage::new(&params);
        let record = stage.process(stage.throughput().apply(1.0), &energy);

        assert_relative_eq!(record.plates, 1000.0);
        assert_relative_eq!(record.energy_kwh, 40.0);
        // 0.9 * 40 kWh * 0.5 kg/kWh = 18 kg
        assert_relative_eq!(record.energy_co2_t, 0.018, max_relative = 1e-12);
    }

    #[test]
    fn test_end_use_split_conserves_mass() {
        let params = PlateParams::default();
        let stage = PlatesStage::new(&params);
        let record = stage.process(stage.throughput().apply(50.0), &EnergyParams::default());
        let total = record.sold_t + record.compost_t + record.discard_t;
        assert_relative_eq!(total, record.flow.output_t, max_relative = 1e-12);
        assert_relative_eq!(record.plate_revenue, record.plates * 0.8 * 12.0, max_relative = 1e-12);
    }

    #[test]
    fn test_composted_plates_carry_their_volume() {
        let params = PlateParams {
            reject_rate: 0.0,
            dry_kg_per_plate: 1.0,
            plate_len_m: 1.0,
            plate_wid_m: 0.5,
            plate_thk_m: 0.04,
            end_use: EndUseAllocation { wood_sale: 0.5, compost: 0.5, discard: 0.0 },
            ..Default::default()
        };
        let stage = PlatesStage::new(&params);
        let record = stage.process(stage.throughput().apply(2.0), &EnergyParams::default());

        assert_relative_eq!(record.plates_composted, 1000.0);
        assert_relative_eq!(record.compost_volume_m3, 20.0, max_relative = 1e-12);
    }

    #[test]
    fn test_margins_and_headcount() {
        let params = PlateParams {
            reject_rate: 0.0,
            dry_kg_per_plate: 1.0,
            end_use: EndUseAllocation { wood_sale: 1.0, compost: 0.0, discard: 0.0 },
            ..Default::default()
        };
        let stage = PlatesStage::new(&params);
        let record = stage.process(stage.throughput().apply(1.0), &EnergyParams::default());

        // 1000 plates at (12 - 3) against EPS at (12 - 6).
        assert_relative_eq!(record.gross_margin, 9000.0);
        assert_relative_eq!(record.competitor_margin, 6000.0);
        assert_eq!(record.jobs_min_automation, 3.0);
        assert_eq!(record.jobs_dev_mid, 79.5);

        let idle = stage.process(stage.throughput().apply(0.0), &EnergyParams::default());
        assert_eq!(idle.jobs_dev_mid, 0.0);
        assert_eq!(idle.gross_margin, 0.0);
    }

    #[test]
    fn test_end_use_must_sum_to_one() {
        let bad = EndUseAllocation { wood_sale: 0.5, compost: 0.3, discard: 0.1 };
        assert!(matches!(bad.validate(), Err(ValidationError::ProportionSum { .. })));

        let negative = EndUseAllocation { wood_sale: 1.2, compost: -0.2, discard: 0.0 };
        assert!(matches!(negative.validate(), Err(ValidationError::OutOfRange { .. })));

        assert!(EndUseAllocation::default().validate().is_ok());
    }
}
