//! Raw pbench tool tables and single-column extraction
//!
//! A pbench tool CSV has a header row naming one column per process or
//! device (e.g. `pidstat-etcd_1234`, `sda-write`) followed by one row per
//! sample interval. Extraction picks a single column by regex and turns it
//! into an ordered `Vec<f64>` whose positions are the implicit time steps.

use crate::error::{AnalyzerError, Result};
use regex::Regex;
use std::path::Path;

/// A table of string cells as read from disk. Row 0 is the header.
///
/// Rows are not required to have equal length; extraction tolerates short
/// rows according to the active [`MalformedPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a table from string slices (mostly for tests and fixtures)
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// Number of data rows (header excluded)
    pub fn data_len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

/// What to do with a data cell that does not parse as a float
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Treat the cell as `0.0`. Matches the historical scraper output, but
    /// silently pulls min/avg/p95 towards zero on corrupt input.
    #[default]
    CoerceToZero,
    /// Reject the whole series with [`AnalyzerError::MalformedValue`]
    Fail,
}

/// Source of raw tables, keyed by file path
pub trait TableReader {
    fn read_table(&self, path: &Path) -> anyhow::Result<RawTable>;
}

/// Reads comma-separated pbench tool output with the `csv` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableReader;

impl TableReader for CsvTableReader {
    fn read_table(&self, path: &Path) -> anyhow::Result<RawTable> {
        read_csv(path)
    }
}

/// Read a CSV file into a [`RawTable`] without interpreting the header
pub fn read_csv(path: &Path) -> anyhow::Result<RawTable> {
    use anyhow::Context;

    tracing::debug!(path = %path.display(), "reading table");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("reading record {} of {}", i, path.display()))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(RawTable { rows })
}

/// Index of the first header cell matched by `pattern`
///
/// First match wins, not best match: `etcd` will pick `etcd-proxy` if that
/// column comes before `etcd`.
pub fn column_index(header: &[String], pattern: &str) -> Result<usize> {
    let re = Regex::new(pattern).map_err(|e| AnalyzerError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    header
        .iter()
        .position(|cell| re.is_match(cell))
        .ok_or_else(|| AnalyzerError::ColumnNotFound {
            pattern: pattern.to_string(),
        })
}

/// Extract the column selected by `column_pattern` as an ordered float series
///
/// The returned vector has exactly one entry per data row.
pub fn extract(
    table: &RawTable,
    column_pattern: &str,
    policy: MalformedPolicy,
) -> Result<Vec<f64>> {
    let header = table.header().ok_or_else(|| AnalyzerError::ColumnNotFound {
        pattern: column_pattern.to_string(),
    })?;
    let column = column_index(header, column_pattern)?;

    let mut values = Vec::with_capacity(table.data_len());
    for (row_idx, row) in table.rows.iter().enumerate().skip(1) {
        let cell = row.get(column).map(|c| c.trim());
        match cell.and_then(|c| c.parse::<f64>().ok()) {
            Some(v) => values.push(v),
            None => match policy {
                MalformedPolicy::CoerceToZero => {
                    tracing::debug!(
                        row = row_idx,
                        column,
                        value = cell.unwrap_or("<missing>"),
                        "coercing malformed cell to 0.0"
                    );
                    values.push(0.0);
                }
                MalformedPolicy::Fail => {
                    return Err(AnalyzerError::MalformedValue {
                        row: row_idx,
                        column,
                        value: cell.unwrap_or_default().to_string(),
                    });
                }
            },
        }
    }

    Ok(values)
}
