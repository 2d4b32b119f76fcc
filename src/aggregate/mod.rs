//! Cross-stage join and derived KPIs.
//!
//! Every stage series is aligned on year over the full span of years seen
//! by any stage. A year a stage does not cover contributes that stage's zero
//! record. KPIs are derived from the joined stage columns only, so
//! recomputing them is idempotent.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::economics::CashFlowSeries;
use crate::eol::{EolRecord, CO2_PER_C};
use crate::growth::GrowthRecord;
use crate::processing::{ExtractionRecord, LogisticsRecord, PlatesRecord, SubstrateRecord};
use crate::series::{TabularRecord, Year, YearlySeries};

/// Derived indicators for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub net_cash_flow: f64,
    pub cumulative_net_cash_flow: f64,
    pub total_energy_kwh: f64,
    pub total_emissions_t: f64,
    pub co2e_sequestered_t: f64,
    pub cumulative_cost: f64,
    pub cumulative_processed_t: f64,
    /// NaN until some mass has been processed.
    pub cost_per_tonne_processed: f64,
    /// NaN in years without plates.
    pub revenue_per_plate: f64,
    /// NaN in years without plates.
    pub energy_kwh_per_plate: f64,
    /// NaN in years without plates.
    pub kg_co2_per_plate: f64,
    /// NaN in years without plate sales.
    pub gross_margin_per_plate: f64,
    /// Margin over an EPS plate; NaN in years without plate sales.
    pub margin_uplift_per_plate: f64,
}

impl TabularRecord for Kpis {
    const COLUMNS: &'static [&'static str] = &[
        "total_revenue",
        "total_cost",
        "net_cash_flow",
        "cumulative_net_cash_flow",
        "total_energy_kwh",
        "total_emissions_t",
        "co2e_sequestered_t",
        "cumulative_cost",
        "cumulative_processed_t",
        "cost_per_tonne_processed",
        "revenue_per_plate",
        "energy_kwh_per_plate",
        "kg_co2_per_plate",
        "gross_margin_per_plate",
        "margin_uplift_per_plate",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.total_revenue,
            self.total_cost,
            self.net_cash_flow,
            self.cumulative_net_cash_flow,
            self.total_energy_kwh,
            self.total_emissions_t,
            self.co2e_sequestered_t,
            self.cumulative_cost,
            self.cumulative_processed_t,
            self.cost_per_tonne_processed,
            self.revenue_per_plate,
            self.energy_kwh_per_plate,
            self.kg_co2_per_plate,
            self.gross_margin_per_plate,
            self.margin_uplift_per_plate,
        ]
    }
}

/// All stage records for one year plus the derived KPIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinedRow {
    pub growth: GrowthRecord,
    pub logistics: LogisticsRecord,
    pub extraction: ExtractionRecord,
    pub substrate: SubstrateRecord,
    pub plates: PlatesRecord,
    pub eol: EolRecord,
    pub kpis: Kpis,
}

impl JoinedRow {
    pub fn revenue(&self) -> f64 {
        self.growth.co2_revenue + self.plates.plate_revenue + self.extraction.extract_revenue + self.eol.credit_revenue
    }

    pub fn cost(&self) -> f64 {
        self.growth.total_cost()
            + self.logistics.transport_cost
            + self.extraction.energy_cost
            + self.substrate.total_cost()
            + self.plates.total_cost()
            + self.eol.total_cost()
    }

    pub fn energy_kwh(&self) -> f64 {
        self.extraction.energy_kwh + self.substrate.energy_kwh + self.plates.energy_kwh
    }

    pub fn emissions_t(&self) -> f64 {
        self.logistics.transport_co2_t
            + self.extraction.energy_co2_t
            + self.substrate.energy_co2_t
            + self.plates.energy_co2_t
    }

    /// Flattened values in [`JoinedDataset::columns`] order, without the year.
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(JoinedDataset::column_count());
        values.extend(self.growth.values());
        values.extend(self.logistics.values());
        values.extend(self.extraction.values());
        values.extend(self.substrate.values());
        values.extend(self.plates.values());
        values.extend(self.eol.values());
        values.extend(self.kpis.values());
        values
    }
}

/// Stage prefixes and their columns, in table order.
const GROUPS: &[(&str, &[&str])] = &[
    ("growth", GrowthRecord::COLUMNS),
    ("logistics", LogisticsRecord::COLUMNS),
    ("extraction", ExtractionRecord::COLUMNS),
    ("substrate", SubstrateRecord::COLUMNS),
    ("plates", PlatesRecord::COLUMNS),
    ("eol", EolRecord::COLUMNS),
    ("kpi", Kpis::COLUMNS),
];

/// The year-aligned dataset across all stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedDataset {
    rows: YearlySeries<JoinedRow>,
}

impl JoinedDataset {
    pub fn rows(&self) -> &YearlySeries<JoinedRow> {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, year: Year) -> Option<&JoinedRow> {
        self.rows.get(year)
    }

    /// Column names, `year` first, then `stage_column` for every stage.
    pub fn columns() -> Vec<String> {
        let mut columns = vec!["year".to_string()];
        for (prefix, names) in GROUPS {
            columns.extend(names.iter().map(|name| format!("{prefix}_{name}")));
        }
        columns
    }

    fn column_count() -> usize {
        GROUPS.iter().map(|(_, names)| names.len()).sum()
    }

    /// Rebuilds every KPI column from the joined stage columns.
    pub fn recompute_kpis(&mut self) {
        self.rows = derive_kpis(&self.rows);
    }

    /// Projects the dataset to yearly net cash flow.
    pub fn cash_flows(&self) -> CashFlowSeries {
        self.rows.map(|_, row| row.kpis.net_cash_flow)
    }

    /// Last row's KPIs (cumulative columns hold run totals).
    pub fn final_kpis(&self) -> Kpis {
        self.rows.rows().last().map(|row| row.kpis).unwrap_or_default()
    }

    /// Sum of a per-row quantity over all years.
    pub fn total(&self, f: impl Fn(&JoinedRow) -> f64) -> f64 {
        self.rows.rows().iter().map(f).sum()
    }

    /// SHA-256 over every year and value bit pattern, as lowercase hex.
    ///
    /// Two datasets with the same checksum are bit-identical.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        for (year, row) in self.rows.iter() {
            hasher.update(year.to_le_bytes());
            for v in row.values() {
                hasher.update(v.to_bits().to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Joins all stage series on year over their full combined span.
pub fn join(
    growth: &YearlySeries<GrowthRecord>,
    logistics: &YearlySeries<LogisticsRecord>,
    extraction: &YearlySeries<ExtractionRecord>,
    substrate: &YearlySeries<SubstrateRecord>,
    plates: &YearlySeries<PlatesRecord>,
    eol: &YearlySeries<EolRecord>,
) -> JoinedDataset {
    let firsts = [
        growth.first_year(),
        logistics.first_year(),
        extraction.first_year(),
        substrate.first_year(),
        plates.first_year(),
        eol.first_year(),
    ];
    let lasts = [
        growth.last_year(),
        logistics.last_year(),
        extraction.last_year(),
        substrate.last_year(),
        plates.last_year(),
        eol.last_year(),
    ];

    let (Some(first), Some(last)) = (firsts.into_iter().flatten().min(), lasts.into_iter().flatten().max()) else {
        return JoinedDataset {
            rows: YearlySeries::empty(0),
        };
    };

    let joined = YearlySeries::from_fn(first, last, |year| JoinedRow {
        growth: growth.get(year).copied().unwrap_or_default(),
        logistics: logistics.get(year).copied().unwrap_or_default(),
        extraction: extraction.get(year).copied().unwrap_or_default(),
        substrate: substrate.get(year).copied().unwrap_or_default(),
        plates: plates.get(year).copied().unwrap_or_default(),
        eol: eol.get(year).copied().unwrap_or_default(),
        kpis: Kpis::default(),
    });

    let dataset = JoinedDataset {
        rows: derive_kpis(&joined),
    };
    debug!(first, last, rows = dataset.len(), "stages joined");
    dataset
}

fn ratio_or_nan(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        f64::NAN
    }
}

fn derive_kpis(rows: &YearlySeries<JoinedRow>) -> YearlySeries<JoinedRow> {
    let mut cumulative_cash = 0.0;
    let mut cumulative_cost = 0.0;
    let mut cumulative_processed = 0.0;

    rows.map(|_, row| {
        let total_revenue = row.revenue();
        let total_cost = row.cost();
        let net_cash_flow = total_revenue - total_cost;
        let total_energy_kwh = row.energy_kwh();
        let total_emissions_t = row.emissions_t();
        let plates = &row.plates;

        cumulative_cash += net_cash_flow;
        cumulative_cost += total_cost;
        cumulative_processed += row.logistics.flow.output_t;

        let kpis = Kpis {
            total_revenue,
            total_cost,
            net_cash_flow,
            cumulative_net_cash_flow: cumulative_cash,
            total_energy_kwh,
            total_emissions_t,
            co2e_sequestered_t: row.eol.soil_carbon_stock_t * CO2_PER_C,
            cumulative_cost,
            cumulative_processed_t: cumulative_processed,
            cost_per_tonne_processed: ratio_or_nan(cumulative_cost, cumulative_processed),
            revenue_per_plate: ratio_or_nan(total_revenue, plates.plates),
            energy_kwh_per_plate: ratio_or_nan(total_energy_kwh, plates.plates),
            kg_co2_per_plate: ratio_or_nan(total_emissions_t * 1000.0, plates.plates),
            gross_margin_per_plate: ratio_or_nan(plates.gross_margin, plates.plates_sold),
            margin_uplift_per_plate: ratio_or_nan(plates.gross_margin - plates.competitor_margin, plates.plates_sold),
        };
        JoinedRow { kpis, ..*row }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::Flow;
    use approx::assert_relative_eq;

    fn growth_rows(first: Year, n: usize) -> YearlySeries<GrowthRecord> {
        YearlySeries::new(
            first,
            (0..n)
                .map(|_| GrowthRecord {
                    maintenance_cost: 100.0,
                    ..Default::default()
                })
                .collect(),
        )
    }

    fn sample() -> JoinedDataset {
        let growth = growth_rows(2030, 3);
        let logistics = YearlySeries::new(
            2032,
            vec![LogisticsRecord {
                flow: Flow { input_t: 50.0, output_t: 40.0, over_capacity_t: 0.0 },
                transport_cost: 60.0,
                ..Default::default()
            }],
        );
        let plates = YearlySeries::new(
            2032,
            vec![PlatesRecord {
                plates: 100.0,
                energy_kwh: 4.0,
                energy_co2_t: 0.002,
                plates_sold: 80.0,
                plate_revenue: 1200.0,
                gross_margin: 720.0,
                competitor_margin: 480.0,
                ..Default::default()
            }],
        );
        let eol = YearlySeries::new(
            2032,
            vec![
                EolRecord { soil_carbon_stock_t: 3.0, credit_revenue: 10.0, ..Default::default() },
                EolRecord { soil_carbon_stock_t: 2.5, monitoring_cost: 5.0, ..Default::default() },
            ],
        );
        join(
            &growth,
            &logistics,
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &plates,
            &eol,
        )
    }

    #[test]
    fn test_join_spans_all_years_without_duplicates() {
        let dataset = sample();
        assert_eq!(dataset.len(), 4);
        let years: Vec<_> = dataset.rows().years().collect();
        assert_eq!(years, vec![2030, 2031, 2032, 2033]);

        // Growth ends in 2032; 2033 is zero-filled for growth.
        assert_eq!(dataset.get(2033).unwrap().growth, GrowthRecord::default());
        assert_eq!(dataset.get(2033).unwrap().eol.monitoring_cost, 5.0);
    }

    #[test]
    fn test_kpi_values() {
        let dataset = sample();
        let y = dataset.get(2032).unwrap().kpis;
        assert_relative_eq!(y.total_revenue, 1210.0);
        assert_relative_eq!(y.total_cost, 160.0);
        assert_relative_eq!(y.net_cash_flow, 1050.0);
        assert_relative_eq!(y.cumulative_net_cash_flow, 850.0);
        assert_relative_eq!(y.co2e_sequestered_t, 11.0, max_relative = 1e-12);
        assert_relative_eq!(y.cost_per_tonne_processed, 360.0 / 40.0);
        assert_relative_eq!(y.revenue_per_plate, 12.1);
        assert_relative_eq!(y.energy_kwh_per_plate, 0.04);

        assert_relative_eq!(y.kg_co2_per_plate, 0.02, max_relative = 1e-12);
        assert_relative_eq!(y.gross_margin_per_plate, 9.0);
        assert_relative_eq!(y.margin_uplift_per_plate, 3.0);

        let last = dataset.final_kpis();
        assert_relative_eq!(last.cumulative_cost, 365.0);
        assert_relative_eq!(last.cumulative_net_cash_flow, 845.0);
    }

    #[test]
    fn test_ratios_are_nan_without_denominator() {
        let dataset = sample();
        let first = dataset.get(2030).unwrap().kpis;
        assert!(first.cost_per_tonne_processed.is_nan());
        assert!(first.revenue_per_plate.is_nan());
        assert!(first.energy_kwh_per_plate.is_nan());
        assert!(first.kg_co2_per_plate.is_nan());
        assert!(first.margin_uplift_per_plate.is_nan());
    }

    #[test]
    fn test_fixation_revenue_counts_toward_cash_flow() {
        let growth = YearlySeries::new(
            2030,
            vec![GrowthRecord { co2_fixed_t: 2.0, co2_revenue: 90.0, maintenance_cost: 40.0, ..Default::default() }],
        );
        let dataset = join(
            &growth,
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
        );
        let kpis = dataset.get(2030).unwrap().kpis;
        assert_relative_eq!(kpis.total_revenue, 90.0);
        assert_relative_eq!(kpis.net_cash_flow, 50.0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut dataset = sample();
        let before = dataset.checksum();
        dataset.recompute_kpis();
        dataset.recompute_kpis();
        assert_eq!(dataset.checksum(), before);
    }

    #[test]
    fn test_columns_match_values() {
        let dataset = sample();
        let columns = JoinedDataset::columns();
        assert_eq!(columns[0], "year");
        assert!(columns.contains(&"plates_plate_revenue".to_string()));
        assert!(columns.contains(&"kpi_net_cash_flow".to_string()));
        for (_, row) in dataset.rows().iter() {
            assert_eq!(row.values().len() + 1, columns.len());
        }
    }

    #[test]
    fn test_empty_inputs_give_empty_dataset() {
        let dataset = join(
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
            &YearlySeries::empty(0),
        );
        assert!(dataset.is_empty());
        assert_eq!(dataset.final_kpis(), Kpis::default());
        assert!(dataset.cash_flows().is_empty());
    }
}
