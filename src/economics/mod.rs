//! Economics engine: NPV, IRR, payback and profit distribution.
//!
//! Cash flows are indexed by period `t = year - first_year`, so the first
//! year is undiscounted.

mod config;

pub use config::{EconomicsParams, ProfitShares};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::series::{Year, YearlySeries};

/// Yearly net cash flow.
pub type CashFlowSeries = YearlySeries<f64>;

/// Lower end of the IRR search range.
pub const IRR_MIN_RATE: f64 = -0.99;
/// Upper end of the IRR search range.
pub const IRR_MAX_RATE: f64 = 10.0;
/// Rate used to pick between several sign-change brackets.
pub const IRR_GUESS: f64 = 0.10;
pub const IRR_MAX_ITERATIONS: u32 = 200;

const IRR_GRID_STEPS: usize = 2_000;

/// Outcome of the IRR search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Irr {
    Converged { rate: f64, iterations: u32 },
    /// Cash flows never change sign, so no rate zeroes the NPV.
    NoSignChange,
    /// Cash flows change sign but NPV has no root inside the search range.
    NoRootInRange,
    /// Bisection ran out of iterations; `best` is the last midpoint.
    NotConverged { best: f64 },
}

impl Irr {
    pub fn rate(&self) -> Option<f64> {
        match *self {
            Irr::Converged { rate, .. } => Some(rate),
            _ => None,
        }
    }

    /// Short label for display.
    pub fn describe(&self) -> String {
        match *self {
            Irr::Converged { rate, .. } => format!("{:.2}%", rate * 100.0),
            Irr::NoSignChange => "undefined (no sign change)".to_string(),
            Irr::NoRootInRange => "undefined (no root in range)".to_string(),
            Irr::NotConverged { best } => format!("not converged (~{:.2}%)", best * 100.0),
        }
    }
}

/// Net present value of `cash_flows` at `rate`, with the first flow at `t = 0`.
pub fn npv(cash_flows: &[f64], rate: f64) -> f64 {
    let base = 1.0 + rate;
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / base.powi(t as i32))
        .sum()
}

/// Internal rate of return of `cash_flows`.
///
/// Samples NPV over `[IRR_MIN_RATE, IRR_MAX_RATE]`, picks the sign-change
/// bracket closest to [`IRR_GUESS`] and bisects it until the bracket can no
/// longer be narrowed: its ends are adjacent floats, or both give the same
/// discount base `1 + r`.
pub fn irr(cash_flows: &[f64]) -> Irr {
    let has_positive = cash_flows.iter().any(|&cf| cf > 0.0);
    let has_negative = cash_flows.iter().any(|&cf| cf < 0.0);
    if !(has_positive && has_negative) {
        return Irr::NoSignChange;
    }

    let step = (IRR_MAX_RATE - IRR_MIN_RATE) / IRR_GRID_STEPS as f64;
    let grid: Vec<(f64, f64)> = (0..=IRR_GRID_STEPS)
        .map(|i| {
            let rate = IRR_MIN_RATE + step * i as f64;
            (rate, npv(cash_flows, rate))
        })
        .collect();

    let bracket = grid
        .windows(2)
        .filter(|w| w[0].1.is_finite() && w[1].1.is_finite() && w[0].1.signum() != w[1].1.signum())
        .map(|w| (w[0], w[1]))
        .min_by(|a, b| {
            let da = ((a.0 .0 + a.1 .0) / 2.0 - IRR_GUESS).abs();
            let db = ((b.0 .0 + b.1 .0) / 2.0 - IRR_GUESS).abs();
            da.total_cmp(&db)
        });

    let Some(((mut lo, mut f_lo), (mut hi, mut f_hi))) = bracket else {
        return Irr::NoRootInRange;
    };

    for iteration in 1..=IRR_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi || 1.0 + lo == 1.0 + hi {
            let rate = if f_lo.abs() <= f_hi.abs() { lo } else { hi };
            return Irr::Converged { rate, iterations: iteration };
        }
        let f_mid = npv(cash_flows, mid);
        if f_mid == 0.0 {
            return Irr::Converged { rate: mid, iterations: iteration };
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
            f_hi = f_mid;
        }
    }

    Irr::NotConverged { best: 0.5 * (lo + hi) }
}

/// First year in which the cumulative cash flow turns non-negative after
/// having been negative.
pub fn payback_year(cash_flows: &CashFlowSeries) -> Option<Year> {
    let mut cumulative = 0.0;
    let mut was_negative = false;
    for (year, cf) in cash_flows.iter() {
        cumulative += cf;
        if cumulative < 0.0 {
            was_negative = true;
        } else if was_negative {
            return Some(year);
        }
    }
    None
}

/// Positive cash flow pooled over all years and split between stakeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitDistribution {
    pub pool: f64,
    pub farmers: f64,
    pub employees: f64,
    pub company: f64,
    pub investors: f64,
}

pub fn distribute(cash_flows: &[f64], shares: &ProfitShares) -> ProfitDistribution {
    let pool: f64 = cash_flows.iter().map(|cf| cf.max(0.0)).sum();
    ProfitDistribution {
        pool,
        farmers: pool * shares.farmers,
        employees: pool * shares.employees,
        company: pool * shares.company,
        investors: pool * shares.investors,
    }
}

/// Returns to co-investors who fund part of the cost up front and then
/// receive the investors' share of the average yearly profit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoinvestorReturns {
    pub contribution: f64,
    pub yearly_payout: f64,
    pub irr: Irr,
    /// Multiple on invested capital; NaN without a contribution.
    pub moic: f64,
}

/// Co-investor cash flows: `-contribution` in the first year, then the
/// yearly payout in each of the remaining `years - 1` years.
pub fn coinvestor_returns(total_cost: f64, total_profit: f64, years: usize, params: &EconomicsParams) -> CoinvestorReturns {
    if years == 0 {
        return CoinvestorReturns {
            contribution: 0.0,
            yearly_payout: 0.0,
            irr: Irr::NoSignChange,
            moic: f64::NAN,
        };
    }
    let contribution = params.coinvest_share * total_cost;
    let yearly_payout = total_profit / years as f64 * params.profit_shares.investors;

    let mut flows = vec![yearly_payout; years];
    flows[0] = -contribution;
    let moic = if contribution > 0.0 {
        yearly_payout * (years - 1) as f64 / contribution
    } else {
        f64::NAN
    };

    CoinvestorReturns {
        contribution,
        yearly_payout,
        irr: irr(&flows),
        moic,
    }
}

/// Economic summary of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicResult {
    pub discount_rate: f64,
    pub npv: f64,
    pub irr: Irr,
    pub payback_year: Option<Year>,
    pub total_net_cash_flow: f64,
    pub distribution: ProfitDistribution,
    pub coinvestor: CoinvestorReturns,
}

/// Evaluates a cash-flow series under the given economics parameters.
///
/// `total_cost` is the undiscounted cost over all years, which sizes the
/// co-investor contribution.
pub fn evaluate(cash_flows: &CashFlowSeries, total_cost: f64, params: &EconomicsParams) -> EconomicResult {
    let flows = cash_flows.rows();
    let npv = npv(flows, params.discount_rate);
    let irr = irr(flows);
    if irr.rate().is_none() {
        warn!(status = %irr.describe(), "IRR undefined for this cash-flow series");
    }

    let total_net_cash_flow: f64 = flows.iter().sum();
    let result = EconomicResult {
        discount_rate: params.discount_rate,
        npv,
        irr,
        payback_year: payback_year(cash_flows),
        total_net_cash_flow,
        distribution: distribute(flows, &params.profit_shares),
        coinvestor: coinvestor_returns(total_cost, total_net_cash_flow, flows.len(), params),
    };
    debug!(npv = result.npv, irr = %result.irr.describe(), "economics evaluated");
    result
}
