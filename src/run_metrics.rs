//! Whole-run metrics from the benchmark's `result.txt`
//!
//! The cluster-loader harness prints JSON objects, one per line, among its
//! regular log output. Lines whose type is `metrics.TestDuration` are kept
//! and stored in the snapshot next to the host summaries.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Type tag of the only metric currently understood
pub const TEST_DURATION_TYPE: &str = "metrics.TestDuration";

/// A test-duration record reported by the benchmark harness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetric {
    #[serde(rename = "Type", alias = "type")]
    pub metric_type: String,
    #[serde(rename = "Marker", alias = "marker", default)]
    pub marker: String,
    #[serde(
        rename = "StartTime",
        alias = "startTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    /// Nanoseconds
    #[serde(rename = "TestDuration", alias = "testDuration")]
    pub test_duration: i64,
}

impl TestMetric {
    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.test_duration.max(0) as u64)
    }
}

#[derive(Deserialize)]
struct BaseMetric {
    #[serde(rename = "Type", alias = "type")]
    metric_type: String,
}

/// Location of `result.txt` for a given pbench search directory
pub fn result_file_path(search_dir: &Path) -> PathBuf {
    search_dir
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("result.txt")
}

/// Extract every recognised metric line from `text`
///
/// Lines that fail to parse or carry an unknown type are logged and skipped.
pub fn parse_metrics(text: &str) -> Vec<TestMetric> {
    // Any line starting with '{' and ending with '}'
    let Ok(line_re) = Regex::new(r"(?m)^\{.*\}$") else {
        return Vec::new();
    };

    let mut metrics = Vec::new();
    for m in line_re.find_iter(text) {
        let line = m.as_str();
        let base: BaseMetric = match serde_json::from_str(line) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("cannot unmarshal line '{}' as a metric: {}", line, e);
                continue;
            }
        };

        if base.metric_type != TEST_DURATION_TYPE {
            tracing::warn!(
                "unsupported metrics type {} in line: {}",
                base.metric_type,
                line
            );
            continue;
        }

        match serde_json::from_str::<TestMetric>(line) {
            Ok(metric) => metrics.push(metric),
            Err(e) => tracing::warn!("cannot unmarshal line '{}' for TestDuration: {}", line, e),
        }
    }
    metrics
}

/// Read run metrics for the pbench tree rooted at `search_dir`
///
/// # Errors
/// Fails when `result.txt` is missing or holds no recognisable metric.
/// Callers treat both as non-fatal.
pub fn read_metrics(search_dir: &Path) -> Result<Vec<TestMetric>> {
    let path = result_file_path(search_dir);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading run metrics from {}", path.display()))?;

    let metrics = parse_metrics(&text);
    if metrics.is_empty() {
        anyhow::bail!("cannot find metrics in file: {}", path.display());
    }
    Ok(metrics)
}
