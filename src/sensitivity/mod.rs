//! One-way sensitivity sweeps and A/B scenario comparison.
//!
//! Each sweep point is an independent scenario copy run through its own
//! pipeline, so points are evaluated in parallel and collected in the order
//! the factors were given.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::economics::Irr;
use crate::pipeline::{Pipeline, SimulationResult};
use crate::scenario::{Scenario, ScenarioParams, ValidationError};

/// A scalar scenario parameter that can be swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityParameter {
    DiscountRate,
    PlatePrice,
    CreditPrice,
    SurvivalRate,
    FiberYield,
    TransportDistance,
    ElectricityPrice,
    MaxBiomassPerTree,
}

impl SensitivityParameter {
    pub const ALL: [SensitivityParameter; 8] = [
        SensitivityParameter::DiscountRate,
        SensitivityParameter::PlatePrice,
        SensitivityParameter::CreditPrice,
        SensitivityParameter::SurvivalRate,
        SensitivityParameter::FiberYield,
        SensitivityParameter::TransportDistance,
        SensitivityParameter::ElectricityPrice,
        SensitivityParameter::MaxBiomassPerTree,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensitivityParameter::DiscountRate => "discount_rate",
            SensitivityParameter::PlatePrice => "plate_price",
            SensitivityParameter::CreditPrice => "credit_price",
            SensitivityParameter::SurvivalRate => "survival_rate",
            SensitivityParameter::FiberYield => "fiber_yield",
            SensitivityParameter::TransportDistance => "transport_distance",
            SensitivityParameter::ElectricityPrice => "electricity_price",
            SensitivityParameter::MaxBiomassPerTree => "max_biomass_per_tree",
        }
    }

    pub fn get(&self, p: &ScenarioParams) -> f64 {
        match self {
            SensitivityParameter::DiscountRate => p.economics.discount_rate,
            SensitivityParameter::PlatePrice => p.plates.plate_price,
            SensitivityParameter::CreditPrice => p.eol.credit_price,
            SensitivityParameter::SurvivalRate => p.growth.survival_rate,
            SensitivityParameter::FiberYield => p.extraction.fiber_yield_frac,
            SensitivityParameter::TransportDistance => p.logistics.transport_distance_km,
            SensitivityParameter::ElectricityPrice => p.energy.electricity_price_per_kwh,
            SensitivityParameter::MaxBiomassPerTree => p.growth.max_biomass_per_tree_kg,
        }
    }

    pub fn set(&self, p: &mut ScenarioParams, value: f64) {
        let field = match self {
            SensitivityParameter::DiscountRate => &mut p.economics.discount_rate,
            SensitivityParameter::PlatePrice => &mut p.plates.plate_price,
            SensitivityParameter::CreditPrice => &mut p.eol.credit_price,
            SensitivityParameter::SurvivalRate => &mut p.growth.survival_rate,
            SensitivityParameter::FiberYield => &mut p.extraction.fiber_yield_frac,
            SensitivityParameter::TransportDistance => &mut p.logistics.transport_distance_km,
            SensitivityParameter::ElectricityPrice => &mut p.energy.electricity_price_per_kwh,
            SensitivityParameter::MaxBiomassPerTree => &mut p.growth.max_biomass_per_tree_kg,
        };
        *field = value;
    }
}

impl fmt::Display for SensitivityParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensitivityParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|p| p.name()).collect();
                format!("unknown parameter '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Outcome of one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    /// Multiplier applied to the baseline value.
    pub factor: f64,
    /// Parameter value actually simulated.
    pub value: f64,
    pub npv: f64,
    pub irr: Irr,
    pub total_revenue: f64,
}

/// Scales `parameter` by each factor and runs the pipeline per point.
///
/// A factor that pushes the parameter out of its valid range yields that
/// point's [`ValidationError`]; the other points are unaffected.
pub fn one_way(
    scenario: &Scenario,
    parameter: SensitivityParameter,
    factors: &[f64],
) -> Vec<Result<SensitivityPoint, ValidationError>> {
    let baseline = parameter.get(scenario.params());

    let points: Vec<_> = factors
        .par_iter()
        .map(|&factor| -> Result<SensitivityPoint, ValidationError> {
            let value = baseline * factor;
            let mut params = scenario.params().clone();
            parameter.set(&mut params, value);
            let variant = Scenario::new(params)?;
            let result = Pipeline::new(&variant).run();
            Ok(SensitivityPoint {
                factor,
                value,
                npv: result.economics.npv,
                irr: result.economics.irr,
                total_revenue: result.dataset.total(|row| row.kpis.total_revenue),
            })
        })
        .collect();

    debug!(
        parameter = parameter.name(),
        points = points.len(),
        failed = points.iter().filter(|p| p.is_err()).count(),
        "sensitivity sweep finished"
    );
    points
}

/// One KPI in an A/B comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiComparison {
    pub kpi: &'static str,
    pub a: f64,
    pub b: f64,
}

impl KpiComparison {
    pub fn delta(&self) -> f64 {
        self.b - self.a
    }
}

/// Key results of two runs side by side. IRR is NaN where undefined.
pub fn compare(a: &SimulationResult, b: &SimulationResult) -> Vec<KpiComparison> {
    let kpis: [(&'static str, fn(&SimulationResult) -> f64); 8] = [
        ("npv", |r| r.economics.npv),
        ("irr", |r| r.economics.irr.rate().unwrap_or(f64::NAN)),
        ("total_revenue", |r| r.dataset.total(|row| row.kpis.total_revenue)),
        ("total_cost", |r| r.dataset.total(|row| row.kpis.total_cost)),
        ("cumulative_net_cash_flow", |r| r.dataset.final_kpis().cumulative_net_cash_flow),
        ("co2e_sequestered_t", |r| r.dataset.final_kpis().co2e_sequestered_t),
        ("total_emissions_t", |r| r.dataset.total(|row| row.kpis.total_emissions_t)),
        ("plates_produced", SimulationResult::plates_produced),
    ];

    kpis.iter()
        .map(|&(kpi, f)| KpiComparison { kpi, a: f(a), b: f(b) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_get_set_round_trip() {
        let mut params = ScenarioParams::default();
        for (i, parameter) in SensitivityParameter::ALL.iter().enumerate() {
            let value = 0.01 * (i + 1) as f64;
            parameter.set(&mut params, value);
            assert_eq!(parameter.get(&params), value);
        }
    }

    #[test]
    fn test_parameter_names_parse() {
        for parameter in SensitivityParameter::ALL {
            assert_eq!(parameter.name().parse::<SensitivityParameter>(), Ok(parameter));
        }
        assert!("nonsense".parse::<SensitivityParameter>().is_err());
    }

    #[test]
    fn test_one_way_preserves_factor_order() {
        let scenario = Scenario::wood_harvest().unwrap();
        let factors = [0.5, 1.0, 1.5, 2.0];
        let points = one_way(&scenario, SensitivityParameter::PlatePrice, &factors);

        assert_eq!(points.len(), factors.len());
        let baseline = Pipeline::new(&scenario).run();
        for (point, factor) in points.iter().zip(factors) {
            let point = point.as_ref().unwrap();
            assert_eq!(point.factor, factor);
            assert_relative_eq!(point.value, 12.0 * factor);
        }

        let at_one = points[1].as_ref().unwrap();
        assert_eq!(at_one.npv, baseline.economics.npv);

        // Higher plate price, higher NPV.
        let npvs: Vec<f64> = points.iter().map(|p| p.as_ref().unwrap().npv).collect();
        assert!(npvs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_one_way_reports_invalid_points() {
        let scenario = Scenario::wood_harvest().unwrap();
        let points = one_way(&scenario, SensitivityParameter::SurvivalRate, &[1.0, 2.0]);
        assert!(points[0].is_ok());
        assert!(matches!(
            points[1],
            Err(ValidationError::OutOfRange { field: "growth.survival_rate", .. })
        ));
    }

    #[test]
    fn test_compare_reports_deltas() {
        let a = Pipeline::new(&Scenario::wood_harvest().unwrap()).run();
        let b = Pipeline::new(&Scenario::soil_regeneration().unwrap()).run();
        let rows = compare(&a, &b);

        let npv = rows.iter().find(|r| r.kpi == "npv").unwrap();
        assert_eq!(npv.a, a.economics.npv);
        assert_relative_eq!(npv.delta(), b.economics.npv - a.economics.npv);

        let co2 = rows.iter().find(|r| r.kpi == "co2e_sequestered_t").unwrap();
        assert!(co2.delta() > 0.0);

        let same = compare(&a, &a);
        assert!(same.iter().filter(|r| r.kpi != "irr").all(|r| r.delta() == 0.0));
    }
}
