//! Error kinds for the reduction and comparison core
//!
//! Every variant here is local to one series or one host. Callers log it and
//! keep going; only collaborator failures (missing snapshot files, unreadable
//! search directories) abort a run, and those travel as `anyhow::Error`.

use thiserror::Error;

/// Errors raised while extracting, summarizing or matching a single series
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("No matching headers for column pattern '{pattern}'")]
    ColumnNotFound { pattern: String },

    #[error("Column pattern '{pattern}' is not a valid regex: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Cannot summarize an empty series")]
    EmptySeries,

    #[error("Malformed value '{value}' in data row {row}, column {column}")]
    MalformedValue {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("Host type {host_kind} not found")]
    HostNotMatched { host_kind: String },

    #[error("Result index for {series_kind}, {resource} not found on host {host_kind}")]
    SeriesNotMatched {
        host_kind: String,
        series_kind: String,
        resource: String,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;
