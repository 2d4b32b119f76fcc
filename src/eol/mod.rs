//! End-of-life: residual biomass applied to soil and tracked as soil carbon.
//!
//! Soil carbon follows a first-order decay with yearly additions. Positive
//! stock changes earn credits; negative changes earn nothing and carry no
//! penalty. Composted plates are laid as a layer whose depth sets the area
//! they cover; mortality residue is spread at a fixed rate per hectare.

mod config;

pub use config::{CreditBasis, EolParams, CO2_PER_C};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::growth::GrowthRecord;
use crate::processing::PlatesRecord;
use crate::series::{TabularRecord, Year, YearlySeries};

/// Material returned to soil in one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilInput {
    pub residue_t: f64,
    pub compost_t: f64,
    /// Bulk volume of the composted plates (m³).
    pub compost_volume_m3: f64,
}

impl SoilInput {
    /// Dry matter applied to soil.
    pub fn dry_matter_t(&self) -> f64 {
        self.residue_t.max(0.0) + self.compost_t.max(0.0)
    }
}

/// End-of-life output for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EolRecord {
    /// Dry matter applied to soil this year.
    pub soil_input_t: f64,
    pub carbon_input_t: f64,
    pub soil_carbon_stock_t: f64,
    pub stock_delta_t: f64,
    /// Credit units earned, in the configured basis.
    pub credits: f64,
    pub credit_revenue: f64,
    pub plate_cover_ha: f64,
    pub residue_cover_ha: f64,
    pub treated_area_ha: f64,
    pub cumulative_treated_area_ha: f64,
    /// Field area needed to keep plate cover under the coverage limit.
    pub land_required_ha: f64,
    pub field_ops_cost: f64,
    pub monitoring_cost: f64,
}

impl EolRecord {
    pub fn total_cost(&self) -> f64 {
        self.field_ops_cost + self.monitoring_cost
    }
}

impl TabularRecord for EolRecord {
    const COLUMNS: &'static [&'static str] = &[
        "soil_input_t",
        "carbon_input_t",
        "soil_carbon_stock_t",
        "stock_delta_t",
        "credits",
        "credit_revenue",
        "plate_cover_ha",
        "residue_cover_ha",
        "treated_area_ha",
        "cumulative_treated_area_ha",
        "land_required_ha",
        "field_ops_cost",
        "monitoring_cost",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.soil_input_t,
            self.carbon_input_t,
            self.soil_carbon_stock_t,
            self.stock_delta_t,
            self.credits,
            self.credit_revenue,
            self.plate_cover_ha,
            self.residue_cover_ha,
            self.treated_area_ha,
            self.cumulative_treated_area_ha,
            self.land_required_ha,
            self.field_ops_cost,
            self.monitoring_cost,
        ]
    }
}

/// Yearly soil input: composted plates plus mortality residue.
///
/// Covers the union of both series' years; a year missing from one side
/// contributes zero.
pub fn soil_inputs(growth: &YearlySeries<GrowthRecord>, plates: &YearlySeries<PlatesRecord>) -> YearlySeries<SoilInput> {
    let (first, last) = match span([growth.first_year(), plates.first_year()], [growth.last_year(), plates.last_year()]) {
        Some(span) => span,
        None => return YearlySeries::empty(0),
    };
    YearlySeries::from_fn(first, last, |year| {
        let plate = plates.get(year).copied().unwrap_or_default();
        SoilInput {
            residue_t: growth.get(year).map_or(0.0, |g| g.mortality_residue_t),
            compost_t: plate.compost_t,
            compost_volume_m3: plate.compost_volume_m3,
        }
    })
}

fn span<const N: usize>(firsts: [Option<Year>; N], lasts: [Option<Year>; N]) -> Option<(Year, Year)> {
    let first = firsts.into_iter().flatten().min()?;
    let last = lasts.into_iter().flatten().max()?;
    Some((first, last))
}

/// Runs the soil-carbon model over `input` and `monitoring_years` further years.
///
/// # Arguments
/// * `input` - Material applied to soil per year
/// * `params` - Validated end-of-life parameters
///
/// # Returns
/// One record per year; empty if `input` is empty.
pub fn simulate(input: &YearlySeries<SoilInput>, params: &EolParams) -> YearlySeries<EolRecord> {
    let (Some(first), Some(last_input)) = (input.first_year(), input.last_year()) else {
        return YearlySeries::empty(0);
    };
    let last = last_input.saturating_add(params.monitoring_years as Year);
    let retention = 1.0 - params.decay_rate;

    let mut stock = 0.0_f64;
    let mut cumulative_area = 0.0_f64;

    let series = YearlySeries::from_fn(first, last, |year| {
        let applied = input.get(year).copied().unwrap_or_default();
        let soil_input_t = applied.dry_matter_t();
        let carbon_input_t = soil_input_t * params.carbon_fraction;

        let previous = stock;
        stock = (previous * retention + carbon_input_t).max(0.0);
        let stock_delta_t = stock - previous;

        let credits = stock_delta_t.max(0.0) * params.credit_basis.factor();

        let plate_cover_ha = params.plate_cover_ha(applied.compost_volume_m3.max(0.0));
        let residue_cover_ha = applied.residue_t.max(0.0) / params.application_rate_t_per_ha;
        let treated_area_ha = plate_cover_ha + residue_cover_ha;
        cumulative_area += treated_area_ha;

        EolRecord {
            soil_input_t,
            carbon_input_t,
            soil_carbon_stock_t: stock,
            stock_delta_t,
            credits,
            credit_revenue: credits * params.credit_price,
            plate_cover_ha,
            residue_cover_ha,
            treated_area_ha,
            cumulative_treated_area_ha: cumulative_area,
            land_required_ha: plate_cover_ha / params.max_land_coverage_frac,
            field_ops_cost: treated_area_ha * params.field_ops_cost_per_ha,
            monitoring_cost: cumulative_area * params.monitoring_cost_per_ha_year,
        }
    });

    debug!(
        years = series.len(),
        final_stock_t = stock,
        treated_area_ha = cumulative_area,
        "end-of-life simulated"
    );
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> EolParams {
        EolParams {
            decay_rate: 0.1,
            carbon_fraction: 0.5,
            credit_price: 10.0,
            credit_basis: CreditBasis::TonnesCarbon,
            monitoring_years: 3,
            application_rate_t_per_ha: 10.0,
            compaction_ratio: 1.0,
            layer_thickness_m: 0.02,
            max_land_coverage_frac: 0.5,
            field_ops_cost_per_ha: 100.0,
            monitoring_cost_per_ha_year: 5.0,
        }
    }

    fn residue(first: Year, tonnes: Vec<f64>) -> YearlySeries<SoilInput> {
        YearlySeries::new(
            first,
            tonnes
                .into_iter()
                .map(|residue_t| SoilInput { residue_t, ..Default::default() })
                .collect(),
        )
    }

    #[test]
    fn test_stock_recursion() {
        let out = simulate(&residue(2030, vec![10.0, 0.0]), &params());

        assert_eq!(out.first_year(), Some(2030));
        assert_eq!(out.last_year(), Some(2034));

        let y0 = out.get(2030).unwrap();
        assert_relative_eq!(y0.soil_carbon_stock_t, 5.0);
        assert_relative_eq!(y0.credit_revenue, 50.0);

        let y1 = out.get(2031).unwrap();
        assert_relative_eq!(y1.soil_carbon_stock_t, 4.5);
        assert_relative_eq!(y1.stock_delta_t, -0.5, epsilon = 1e-12);
        assert_eq!(y1.credit_revenue, 0.0);
    }

    #[test]
    fn test_stock_never_negative() {
        let mut p = params();
        p.decay_rate = 1.0;
        for (_, r) in simulate(&residue(2020, vec![3.0, 0.0, 7.0, 0.0, 0.0]), &p).iter() {
            assert!(r.soil_carbon_stock_t >= 0.0);
            assert!(r.credit_revenue >= 0.0);
        }
    }

    #[test]
    fn test_co2e_basis_scales_credits() {
        let mut p = params();
        p.credit_basis = CreditBasis::TonnesCo2e;
        let out = simulate(&residue(2030, vec![10.0]), &p);
        assert_relative_eq!(out.get(2030).unwrap().credits, 5.0 * CO2_PER_C, max_relative = 1e-12);
    }

    #[test]
    fn test_area_and_monitoring_costs() {
        let out = simulate(&residue(2030, vec![20.0, 10.0]), &params());

        let y0 = out.get(2030).unwrap();
        assert_relative_eq!(y0.treated_area_ha, 2.0);
        assert_relative_eq!(y0.field_ops_cost, 200.0);
        assert_relative_eq!(y0.monitoring_cost, 10.0);

        let y1 = out.get(2031).unwrap();
        assert_relative_eq!(y1.cumulative_treated_area_ha, 3.0);
        assert_relative_eq!(y1.monitoring_cost, 15.0);

        // Monitoring continues on the treated area after inputs stop.
        let tail = out.get(2034).unwrap();
        assert_eq!(tail.field_ops_cost, 0.0);
        assert_relative_eq!(tail.monitoring_cost, 15.0);
    }

    #[test]
    fn test_plate_layer_sets_cover_area() {
        // 1000 plates of 0.06 m³ at 2 cm depth cover 3000 m².
        let input = YearlySeries::new(
            2030,
            vec![SoilInput { residue_t: 5.0, compost_t: 1.1, compost_volume_m3: 60.0 }],
        );
        let r = *simulate(&input, &params()).get(2030).unwrap();

        assert_relative_eq!(r.soil_input_t, 6.1);
        assert_relative_eq!(r.plate_cover_ha, 0.3, max_relative = 1e-12);
        assert_relative_eq!(r.residue_cover_ha, 0.5);
        assert_relative_eq!(r.treated_area_ha, 0.8, max_relative = 1e-12);
        assert_relative_eq!(r.land_required_ha, 0.6, max_relative = 1e-12);
        assert_relative_eq!(r.field_ops_cost, 80.0, max_relative = 1e-12);
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let out = simulate(&YearlySeries::empty(2030), &params());
        assert!(out.is_empty());
    }

    #[test]
    fn test_soil_inputs_combine_compost_and_residue() {
        let growth = YearlySeries::new(
            2030,
            vec![
                GrowthRecord { mortality_residue_t: 1.0, ..Default::default() },
                GrowthRecord { mortality_residue_t: 2.0, ..Default::default() },
            ],
        );
        let plates = YearlySeries::new(
            2031,
            vec![
                PlatesRecord { compost_t: 4.0, compost_volume_m3: 0.2, ..Default::default() },
                PlatesRecord { compost_t: 8.0, compost_volume_m3: 0.4, ..Default::default() },
            ],
        );
        let inputs = soil_inputs(&growth, &plates);
        let dry: Vec<f64> = inputs.rows().iter().map(SoilInput::dry_matter_t).collect();
        assert_eq!(dry, vec![1.0, 6.0, 8.0]);
        assert_eq!(inputs.first_year(), Some(2030));
        assert_eq!(inputs.get(2032).unwrap().compost_volume_m3, 0.4);
        assert_eq!(inputs.get(2030).unwrap().compost_volume_m3, 0.0);
    }
}
