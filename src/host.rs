//! Per-host summaries and the run snapshot
//!
//! A [`RunSnapshot`] is the unit of comparison: one [`Host`] per monitored
//! node, each carrying the [`SeriesSummary`] records computed for it. The
//! serde field names follow the `out.json` layout written by earlier scraper
//! releases so old snapshots remain comparable.

use crate::run_metrics::TestMetric;
use crate::stats::{summarize_series, Summary};
use crate::table::{extract, MalformedPolicy, TableReader};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// A resource-scoped numeric time sequence awaiting summarization
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Process, device or namespace name
    pub kind: String,
    /// What was measured, e.g. `cpu_usage_percent_cpu`
    pub resource: String,
    pub values: Vec<f64>,
}

/// Summary statistics for one series on one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeriesSummary {
    pub kind: String,
    pub resource: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub pct95: f64,
    /// Table the series was read from; not persisted
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl SeriesSummary {
    pub fn from_summary(kind: String, resource: String, summary: Summary) -> Self {
        Self {
            kind,
            resource,
            min: summary.min,
            max: summary.max,
            avg: summary.avg,
            pct95: summary.pct95,
            path: None,
        }
    }

    /// The four statistics without the series labels
    pub fn stats(&self) -> Summary {
        Summary {
            min: self.min,
            max: self.max,
            avg: self.avg,
            pct95: self.pct95,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.stats().is_finite()
    }
}

/// One monitored node and its summaries, in extraction order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Host-type identifier (e.g. `svt-master-1`), not a hostname
    #[serde(rename = "Kind")]
    pub kind: String,
    #[serde(
        rename = "ResultDir",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub result_dir: Option<String>,
    #[serde(rename = "Results", default, deserialize_with = "null_as_empty")]
    pub summaries: Vec<SeriesSummary>,
}

impl Host {
    pub fn new(kind: impl Into<String>, result_dir: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            result_dir,
            summaries: Vec::new(),
        }
    }
}

/// Everything one scrape produced
///
/// Host kinds are assumed unique within a snapshot. Duplicates are not
/// rejected; comparison uses whichever comes first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    #[serde(rename = "Hosts", default, deserialize_with = "null_as_empty")]
    pub hosts: Vec<Host>,
    #[serde(rename = "Metrics", default, deserialize_with = "null_as_empty")]
    pub metrics: Vec<TestMetric>,
}

impl RunSnapshot {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self {
            hosts,
            metrics: Vec::new(),
        }
    }

    /// Total number of summaries across all hosts
    pub fn summary_count(&self) -> usize {
        self.hosts.iter().map(|h| h.summaries.len()).sum()
    }
}

// Snapshots written by the Go scraper encode empty slices as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A raw table on disk and the column labels to pull out of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    pub path: PathBuf,
    /// Resource name given to every summary from this file
    pub resource: String,
    pub labels: Vec<String>,
}

/// Build the [`Host`] record for one node
///
/// Files are visited in the order given and labels in file order, so the
/// caller controls (and must keep stable) the summary ordering. A file that
/// cannot be read, or a label that cannot be extracted or summarized, is
/// logged and left out; its siblings are still processed.
pub fn aggregate<R: TableReader + ?Sized>(
    host_kind: &str,
    result_dir: Option<String>,
    table_files: &[TableFile],
    policy: MalformedPolicy,
    reader: &R,
) -> Host {
    let mut host = Host::new(host_kind, result_dir);

    for file in table_files {
        let table = match reader.read_table(&file.path) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(
                    host = host_kind,
                    path = %file.path.display(),
                    "skipping unreadable table: {:#}",
                    e
                );
                continue;
            }
        };

        for label in &file.labels {
            let summary = extract(&table, label, policy).and_then(|values| {
                summarize_series(&Series {
                    kind: label.clone(),
                    resource: file.resource.clone(),
                    values,
                })
            });

            match summary {
                Ok(mut summary) => {
                    summary.path = Some(file.path.clone());
                    host.summaries.push(summary);
                }
                Err(e) => tracing::warn!(
                    host = host_kind,
                    path = %file.path.display(),
                    label = label.as_str(),
                    "series omitted: {}",
                    e
                ),
            }
        }
    }

    tracing::debug!(
        host = host_kind,
        summaries = host.summaries.len(),
        "host aggregated"
    );
    host
}
