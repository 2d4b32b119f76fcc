//! Plant staffing.

use serde::{Deserialize, Serialize};

use crate::scenario::validate::{self, ValidationError};

/// Headcount of the plate plant while it is running.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaborParams {
    /// Employees needed to run a fully automated line.
    pub min_automation_employees: u32,
    pub jobs_per_shift_low: u32,
    pub jobs_per_shift_high: u32,
    pub shifts_per_day: u32,
}

impl Default for LaborParams {
    fn default() -> Self {
        Self {
            min_automation_employees: 3,
            jobs_per_shift_low: 3,
            jobs_per_shift_high: 50,
            shifts_per_day: 3,
        }
    }
}

impl LaborParams {
    pub fn jobs_min_automation(&self) -> f64 {
        self.min_automation_employees as f64
    }

    /// Midpoint of the per-shift range over all shifts, for a manual line.
    pub fn jobs_dev_mid(&self) -> f64 {
        (self.jobs_per_shift_low + self.jobs_per_shift_high) as f64 / 2.0 * self.shifts_per_day as f64
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        let low = self.jobs_per_shift_low as f64;
        validate::in_range("plates.labor.min_automation_employees", self.min_automation_employees as f64, 1.0, 100.0)?;
        validate::in_range("plates.labor.jobs_per_shift_low", low, 1.0, 100.0)?;
        validate::in_range("plates.labor.jobs_per_shift_high", self.jobs_per_shift_high as f64, low, 500.0)?;
        validate::in_range("plates.labor.shifts_per_day", self.shifts_per_day as f64, 1.0, 3.0)
    }
}
