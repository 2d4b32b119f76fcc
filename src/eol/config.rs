//! End-of-life parameters.

use serde::{Deserialize, Serialize};

use crate::scenario::validate::{self, ValidationError};

/// Mass ratio of CO₂ to carbon.
pub const CO2_PER_C: f64 = 44.0 / 12.0;

/// Unit in which soil-carbon credits are sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditBasis {
    /// Tonnes of elemental carbon.
    TonnesCarbon,
    /// Tonnes of CO₂ equivalent.
    TonnesCo2e,
}

impl Default for CreditBasis {
    fn default() -> Self {
        Self::TonnesCo2e
    }
}

impl CreditBasis {
    /// Multiplier from tonnes of carbon to credit units.
    pub fn factor(&self) -> f64 {
        match self {
            CreditBasis::TonnesCarbon => 1.0,
            CreditBasis::TonnesCo2e => CO2_PER_C,
        }
    }
}

/// Parameters for soil application and carbon accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EolParams {
    /// Fraction of the soil-carbon stock lost each year (0-1).
    pub decay_rate: f64,
    /// Carbon content of applied dry matter (0-1).
    pub carbon_fraction: f64,
    /// Price per credit unit.
    pub credit_price: f64,
    pub credit_basis: CreditBasis,
    /// Years tracked after the last year with soil input.
    pub monitoring_years: u32,

    /// Mortality residue spread per treated hectare (t/ha).
    pub application_rate_t_per_ha: f64,
    /// Applied volume over bulk volume of crushed plates.
    pub compaction_ratio: f64,
    /// Depth of the plate layer laid on soil (m).
    pub layer_thickness_m: f64,
    /// Largest share of a field that may be covered with plates (0-1).
    pub max_land_coverage_frac: f64,
    pub field_ops_cost_per_ha: f64,
    /// Charged on the cumulative treated area every year.
    pub monitoring_cost_per_ha_year: f64,
}

impl Default for EolParams {
    fn default() -> Self {
        Self {
            decay_rate: 0.05,
            carbon_fraction: 0.47,
            credit_price: 60.0,
            credit_basis: CreditBasis::default(),
            monitoring_years: 10,

            application_rate_t_per_ha: 20.0,
            compaction_ratio: 1.0,
            layer_thickness_m: 0.02,
            max_land_coverage_frac: 0.5,
            field_ops_cost_per_ha: 80.0,
            monitoring_cost_per_ha_year: 10.0,
        }
    }
}

impl EolParams {
    /// Hectares covered by `volume_m3` of crushed plates.
    pub fn plate_cover_ha(&self, volume_m3: f64) -> f64 {
        volume_m3 * self.compaction_ratio / self.layer_thickness_m / 10_000.0
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::unit_interval("eol.decay_rate", self.decay_rate)?;
        validate::unit_interval("eol.carbon_fraction", self.carbon_fraction)?;
        validate::non_negative("eol.credit_price", self.credit_price, 10_000.0)?;
        validate::in_range("eol.monitoring_years", self.monitoring_years as f64, 0.0, 200.0)?;
        validate::in_range("eol.application_rate_t_per_ha", self.application_rate_t_per_ha, 1e-3, 1_000.0)?;
        validate::in_range("eol.compaction_ratio", self.compaction_ratio, 0.1, 100.0)?;
        validate::in_range("eol.layer_thickness_m", self.layer_thickness_m, 1e-6, 10.0)?;
        validate::in_range("eol.max_land_coverage_frac", self.max_land_coverage_frac, 1e-6, 1.0)?;
        validate::non_negative("eol.field_ops_cost_per_ha", self.field_ops_cost_per_ha, 1e5)?;
        validate::non_negative("eol.monitoring_cost_per_ha_year", self.monitoring_cost_per_ha_year, 1e5)
    }
}
