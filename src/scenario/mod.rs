//! Scenario parameters: one group per component plus energy and economics.
//!
//! [`ScenarioParams`] is the raw, editable document. [`Scenario`] is the
//! validated, immutable form the pipeline consumes; it can only be obtained
//! through [`Scenario::new`] or by deserializing, which validates.

pub mod validate;

pub use validate::ValidationError;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::economics::{EconomicsParams, ProfitShares};
use crate::eol::{CreditBasis, EolParams};
use crate::growth::GrowthParams;
use crate::processing::{
    EndUseAllocation, EnergyParams, ExtractionParams, LogisticsParams, PlateParams, SubstrateParams,
};

/// Errors from reading or writing scenario documents.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid scenario document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid scenario: {0}")]
    Validation(#[from] ValidationError),
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
}

/// Complete, unvalidated scenario description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub name: String,
    pub growth: GrowthParams,
    pub logistics: LogisticsParams,
    pub extraction: ExtractionParams,
    pub substrate: SubstrateParams,
    pub plates: PlateParams,
    pub eol: EolParams,
    pub energy: EnergyParams,
    pub economics: EconomicsParams,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            name: "wood_harvest".to_string(),
            growth: GrowthParams::default(),
            logistics: LogisticsParams::default(),
            extraction: ExtractionParams::default(),
            substrate: SubstrateParams::default(),
            plates: PlateParams::default(),
            eol: EolParams::default(),
            energy: EnergyParams::default(),
            economics: EconomicsParams::default(),
        }
    }
}

impl ScenarioParams {
    pub fn wood_harvest() -> Self {
        Self::default()
    }

    pub fn soil_regeneration() -> Self {
        let mut params = ScenarioParams {
            name: "soil_regeneration".to_string(),
            ..Default::default()
        };
        params.plates.end_use = EndUseAllocation {
            wood_sale: 0.20,
            compost: 0.75,
            discard: 0.05,
        };
        params.eol.credit_basis = CreditBasis::TonnesCo2e;
        params.eol.credit_price = 90.0;
        params.eol.monitoring_years = 20;
        params.economics.profit_shares = ProfitShares {
            farmers: 0.25,
            employees: 0.15,
            company: 0.25,
            investors: 0.35,
        };
        params
    }

    /// Checks every group; returns the first violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.growth.validate()?;
        self.logistics.validate()?;
        self.extraction.validate()?;
        self.substrate.validate()?;
        self.plates.validate()?;
        self.eol.validate()?;
        self.energy.validate()?;
        self.economics.validate()
    }
}

/// A validated scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScenarioParams", into = "ScenarioParams")]
pub struct Scenario {
    params: ScenarioParams,
}

impl Scenario {
    pub fn new(params: ScenarioParams) -> Result<Self, ValidationError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Timber-led scheme: most plate output is sold.
    pub fn wood_harvest() -> Result<Self, ValidationError> {
        Self::new(ScenarioParams::wood_harvest())
    }

    /// Soil-led scheme: most plate output is composted back onto land and
    /// credited as soil carbon.
    pub fn soil_regeneration() -> Result<Self, ValidationError> {
        Self::new(ScenarioParams::soil_regeneration())
    }

    /// Looks up a preset by name and validates it.
    pub fn preset(name: &str) -> Result<Self, ScenarioError> {
        let params = match name {
            "wood_harvest" => ScenarioParams::wood_harvest(),
            "soil_regeneration" => ScenarioParams::soil_regeneration(),
            _ => return Err(ScenarioError::UnknownPreset(name.to_string())),
        };
        Ok(Self::new(params)?)
    }

    pub const PRESETS: &'static [&'static str] = &["wood_harvest", "soil_regeneration"];

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    /// Returns the raw parameters for editing; re-validate with [`Scenario::new`].
    pub fn into_params(self) -> ScenarioParams {
        self.params
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(&self.params)?)
    }

    /// Parses and validates a scenario document.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let params: ScenarioParams = serde_json::from_str(json)?;
        Ok(Self::new(params)?)
    }

    /// SHA-256 of the canonical (compact) JSON form, as lowercase hex.
    ///
    /// Equal fingerprints mean equal parameters, so results can be memoised on it.
    pub fn fingerprint(&self) -> Result<String, ScenarioError> {
        let bytes = serde_json::to_vec(&self.params)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl TryFrom<ScenarioParams> for Scenario {
    type Error = ValidationError;

    fn try_from(params: ScenarioParams) -> Result<Self, Self::Error> {
        Scenario::new(params)
    }
}

impl From<Scenario> for ScenarioParams {
    fn from(scenario: Scenario) -> Self {
        scenario.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::GrowthCurve;

    #[test]
    fn test_presets_are_valid() {
        for name in Scenario::PRESETS {
            let scenario = Scenario::preset(name).unwrap();
            assert_eq!(scenario.name(), *name);
        }
        assert!(matches!(
            Scenario::preset("unknown"),
            Err(ScenarioError::UnknownPreset(name)) if name == "unknown"
        ));
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let mut params = Scenario::soil_regeneration().unwrap().into_params();
        params.growth.curve = GrowthCurve::Gompertz {
            growth_rate: 0.1 + 0.2,
            displacement: 4.3,
        };
        params.logistics.capacity_t_per_year = Some(1234.567_890_123);
        let scenario = Scenario::new(params).unwrap();

        let json = scenario.to_json().unwrap();
        let back = Scenario::from_json(&json).unwrap();
        assert_eq!(back, scenario);
        assert_eq!(back.fingerprint().unwrap(), scenario.fingerprint().unwrap());
    }

    #[test]
    fn test_deserialize_validates() {
        let mut params = ScenarioParams::default();
        params.growth.survival_rate = 1.5;
        let json = serde_json::to_string(&params).unwrap();

        assert!(serde_json::from_str::<Scenario>(&json).is_err());
        assert!(matches!(
            Scenario::from_json(&json),
            Err(ScenarioError::Validation(ValidationError::OutOfRange {
                field: "growth.survival_rate",
                ..
            }))
        ));
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let scenario = Scenario::from_json(r#"{ "name": "short", "economics": { "discount_rate": 0.05, "profit_shares": { "farmers": 0.25, "employees": 0.25, "company": 0.25, "investors": 0.25 } } }"#).unwrap();
        assert_eq!(scenario.name(), "short");
        assert_eq!(scenario.params().economics.discount_rate, 0.05);
        assert_eq!(scenario.params().growth, GrowthParams::default());
    }

    #[test]
    fn test_fingerprint_changes_with_parameters() {
        let a = Scenario::wood_harvest().unwrap();
        let mut params = a.clone().into_params();
        params.plates.plate_price += 1.0;
        let b = Scenario::new(params).unwrap();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn test_years_near_integer_limit_are_rejected() {
        let mut params = ScenarioParams::default();
        params.growth.planting_year = i32::MAX - 3;
        params.growth.harvest_year = i32::MAX - 1;
        assert!(matches!(
            Scenario::new(params),
            Err(ValidationError::OutOfRange { field: "growth.planting_year", .. })
        ));

        let mut params = ScenarioParams::default();
        params.growth.harvest_year = params.growth.planting_year + 150;
        assert!(matches!(Scenario::new(params), Err(ValidationError::HorizonTooLong { .. })));
    }

    #[test]
    fn test_harvest_before_planting_is_rejected() {
        let mut params = ScenarioParams::default();
        params.growth.harvest_year = params.growth.planting_year - 1;
        assert!(matches!(
            Scenario::new(params),
            Err(ValidationError::HarvestBeforePlanting { .. })
        ));
    }
}
