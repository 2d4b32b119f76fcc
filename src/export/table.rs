//! Delimited text export of the joined dataset and individual stage series.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aggregate::JoinedDataset;
use crate::pipeline::SimulationResult;
use crate::series::{TabularRecord, YearlySeries};

/// Errors that can occur during table export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Delimiter {0:?} would be ambiguous with numeric values")]
    InvalidDelimiter(char),
}

/// Options for delimited export.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Field separator.
    pub delimiter: char,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl TableOptions {
    fn check(&self) -> Result<(), ExportError> {
        let d = self.delimiter;
        if d.is_ascii_digit() || matches!(d, '.' | '-' | '+' | 'e' | 'E' | '\n' | '\r' | '"') {
            return Err(ExportError::InvalidDelimiter(d));
        }
        Ok(())
    }
}

fn write_row<W: Write>(writer: &mut W, year: i32, values: &[f64], delimiter: char) -> std::io::Result<()> {
    write!(writer, "{year}")?;
    for v in values {
        if !v.is_finite() {
            write!(writer, "{delimiter}")?;
        } else {
            write!(writer, "{delimiter}{v}")?;
        }
    }
    writeln!(writer)
}

/// Writes the joined dataset: a header row, then one row per year.
///
/// Non-finite values (NaN, ±inf) are written as empty fields.
pub fn write_table<W: Write>(dataset: &JoinedDataset, writer: &mut W, options: &TableOptions) -> Result<(), ExportError> {
    options.check()?;
    let d = options.delimiter.to_string();
    writeln!(writer, "{}", JoinedDataset::columns().join(&d))?;
    for (year, row) in dataset.rows().iter() {
        write_row(writer, year, &row.values(), options.delimiter)?;
    }
    Ok(())
}

/// Writes one stage series with `year` followed by the record's columns.
pub fn write_series<R: TabularRecord, W: Write>(
    series: &YearlySeries<R>,
    writer: &mut W,
    options: &TableOptions,
) -> Result<(), ExportError> {
    options.check()?;
    let d = options.delimiter.to_string();
    let mut header = vec!["year"];
    header.extend_from_slice(R::COLUMNS);
    writeln!(writer, "{}", header.join(&d))?;
    for (year, record) in series.iter() {
        write_row(writer, year, &record.values(), options.delimiter)?;
    }
    Ok(())
}

/// Exports the joined dataset to a file.
///
/// # Arguments
/// * `dataset` - The dataset to export
/// * `path` - Output file path
/// * `options` - Delimiter settings
///
/// # Returns
/// `Ok(())` on success, or an error if export fails
pub fn export_table(dataset: &JoinedDataset, path: &Path, options: &TableOptions) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_table(dataset, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

fn export_series<R: TabularRecord>(series: &YearlySeries<R>, path: &Path, options: &TableOptions) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_series(series, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

/// Exports a full run: joined table, one table per stage and the economic summary.
///
/// Files are named `{base_name}_{part}.{ext}`. With the default comma
/// delimiter tables get a `.csv` extension, otherwise `.txt`.
///
/// # Returns
/// Paths of the written files, joined table first.
pub fn export_run(
    result: &SimulationResult,
    output_dir: &Path,
    base_name: &str,
    options: &TableOptions,
) -> Result<Vec<PathBuf>, ExportError> {
    options.check()?;
    std::fs::create_dir_all(output_dir)?;

    let ext = if options.delimiter == ',' { "csv" } else { "txt" };
    let path_for = |part: &str, ext: &str| output_dir.join(format!("{base_name}_{part}.{ext}"));
    let mut written = Vec::new();

    let path = path_for("results", ext);
    export_table(&result.dataset, &path, options)?;
    written.push(path);

    let path = path_for("growth", ext);
    export_series(&result.growth, &path, options)?;
    written.push(path);
    let path = path_for("logistics", ext);
    export_series(&result.logistics, &path, options)?;
    written.push(path);
    let path = path_for("extraction", ext);
    export_series(&result.extraction, &path, options)?;
    written.push(path);
    let path = path_for("substrate", ext);
    export_series(&result.substrate, &path, options)?;
    written.push(path);
    let path = path_for("plates", ext);
    export_series(&result.plates, &path, options)?;
    written.push(path);
    let path = path_for("eol", ext);
    export_series(&result.eol, &path, options)?;
    written.push(path);

    let path = path_for("economics", "json");
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &result.economics)?;
    writer.flush()?;
    written.push(path);

    Ok(written)
}
