//! perf-analyzer - pbench/Prometheus run summarizer and p95 regression checker
//!
//! This library reduces per-host performance time series to
//! {min, max, mean, p95}, groups them into a run snapshot, and compares two
//! snapshots within a relative tolerance band.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod host;
pub mod json_output;
pub mod prometheus;
pub mod regression;
pub mod run_metrics;
pub mod scan;
pub mod stats;
pub mod table;

pub use error::AnalyzerError;
