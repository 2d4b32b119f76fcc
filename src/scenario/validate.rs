//! Range and proportion checks used by the parameter groups.

use thiserror::Error;

use crate::series::Year;

/// Tolerance for proportions that must sum to exactly one.
pub const PROPORTION_TOLERANCE: f64 = 1e-9;

/// A parameter value that violates its declared constraints.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{group} proportions must sum to 1 (got {sum})")]
    ProportionSum { group: &'static str, sum: f64 },
    #[error("harvest year {harvest} precedes planting year {planting}")]
    HarvestBeforePlanting { planting: Year, harvest: Year },
    #[error("{field} spans {years} years (at most {max})")]
    HorizonTooLong { field: &'static str, years: i64, max: u32 },
    #[error("{field} capacity must be non-negative (got {value})")]
    CapacityNegative { field: &'static str, value: f64 },
}

/// Checks `min <= value <= max` (inclusive).
pub fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

/// Checks a rate or fraction lies in `[0, 1]`.
pub fn unit_interval(field: &'static str, value: f64) -> Result<(), ValidationError> {
    in_range(field, value, 0.0, 1.0)
}

/// Checks a cost or price is finite and non-negative, up to `max`.
pub fn non_negative(field: &'static str, value: f64, max: f64) -> Result<(), ValidationError> {
    in_range(field, value, 0.0, max)
}

/// Checks that a set of proportions each lie in `[0, 1]` and sum to one.
pub fn proportions(group: &'static str, parts: &[(&'static str, f64)]) -> Result<(), ValidationError> {
    for &(field, value) in parts {
        unit_interval(field, value)?;
    }
    let sum: f64 = parts.iter().map(|&(_, v)| v).sum();
    if (sum - 1.0).abs() > PROPORTION_TOLERANCE {
        return Err(ValidationError::ProportionSum { group, sum });
    }
    Ok(())
}

/// Checks that a set of shares each lie in `[0, 1]` and sum to at most one.
pub fn proportions_at_most_one(group: &'static str, parts: &[(&'static str, f64)]) -> Result<(), ValidationError> {
    for &(field, value) in parts {
        unit_interval(field, value)?;
    }
    let sum: f64 = parts.iter().map(|&(_, v)| v).sum();
    if sum > 1.0 + PROPORTION_TOLERANCE {
        return Err(ValidationError::ProportionSum { group, sum });
    }
    Ok(())
}

/// Checks an optional yearly capacity cap.
pub fn capacity(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::NotFinite { field }),
        Some(v) if v < 0.0 => Err(ValidationError::CapacityNegative { field, value: v }),
        _ => Ok(()),
    }
}
