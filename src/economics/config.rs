//! Economics parameters.

use serde::{Deserialize, Serialize};

use crate::scenario::validate::{self, ValidationError};

/// Split of positive cash flow between stakeholders. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitShares {
    pub farmers: f64,
    pub employees: f64,
    pub company: f64,
    pub investors: f64,
}

impl Default for ProfitShares {
    fn default() -> Self {
        Self {
            farmers: 0.10,
            employees: 0.10,
            company: 0.30,
            investors: 0.50,
        }
    }
}

impl ProfitShares {
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::proportions(
            "economics.profit_shares",
            &[
                ("economics.profit_shares.farmers", self.farmers),
                ("economics.profit_shares.employees", self.employees),
                ("economics.profit_shares.company", self.company),
                ("economics.profit_shares.investors", self.investors),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicsParams {
    /// Annual discount rate used for NPV.
    pub discount_rate: f64,
    pub profit_shares: ProfitShares,
    /// Share of total cost put up front by co-investors (0-1).
    pub coinvest_share: f64,
}

impl Default for EconomicsParams {
    fn default() -> Self {
        Self {
            discount_rate: 0.08,
            profit_shares: ProfitShares::default(),
            coinvest_share: 0.20,
        }
    }
}

impl EconomicsParams {
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate::in_range("economics.discount_rate", self.discount_rate, -0.5, 1.0)?;
        validate::unit_interval("economics.coinvest_share", self.coinvest_share)?;
        self.profit_shares.validate()
    }
}
