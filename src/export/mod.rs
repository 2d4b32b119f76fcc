//! Export module for scenario documents and result tables.
//!
//! Scenarios are stored as JSON; results as delimited text with one row
//! per year, plus a JSON economic summary.

mod scenario;
mod table;

pub use scenario::{load_scenario, save_scenario};
pub use table::{export_run, export_table, write_series, write_table, ExportError, TableOptions};
