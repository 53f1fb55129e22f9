//! Monitor and alias configuration loaded from TOML
//!
//! Which pbench tool files to open, which columns to pull from each, and
//! which process renames to tolerate when comparing runs.

use crate::regression::ProcessAliases;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../analyzer-default.toml");

/// Which scrape flag overrides a monitor's labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorGroup {
    Process,
    Block,
    Network,
}

/// One monitored tool file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEntry {
    /// File name (also a regex) searched for under each host directory
    pub file: String,
    #[serde(default)]
    pub group: Option<MonitorGroup>,
    /// Column label regexes, extracted in this order
    pub labels: Vec<String>,
}

/// Parsed configuration file
///
/// # Example TOML
/// ```toml
/// [[monitor]]
/// file = "cpu_usage_percent_cpu.csv"
/// group = "process"
/// labels = ["etcd", "crio"]
///
/// [aliases]
/// "openshift_start_node_" = "hyperkube_kubelet_"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub monitor: Vec<MonitorEntry>,
    #[serde(default)]
    pub aliases: ProcessAliases,
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file, replacing the built-in defaults
    ///
    /// # Errors
    /// Returns error if the file doesn't exist or has invalid TOML syntax.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse TOML configuration: {}",
                path.as_ref().display()
            )
        })
    }

    /// Configuration compiled into the binary
    pub fn builtin() -> Result<Self> {
        toml::from_str(DEFAULT_TOML).context("Failed to parse embedded analyzer-default.toml")
    }

    /// Load `path` if given, otherwise the built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_toml(p),
            None => Self::builtin(),
        }
    }

    /// Replace the labels of every monitor in `group`
    pub fn override_labels(&mut self, group: MonitorGroup, labels: Vec<String>) {
        for entry in self.monitor.iter_mut().filter(|m| m.group == Some(group)) {
            entry.labels = labels.clone();
        }
    }

    /// Monitors keyed by file name, in sorted file order
    ///
    /// Files left without labels are dropped. A file listed twice keeps its
    /// last label list.
    pub fn monitor_set(&self) -> MonitorSet {
        let mut files = BTreeMap::new();
        for entry in &self.monitor {
            if entry.labels.is_empty() {
                files.remove(&entry.file);
                continue;
            }
            files.insert(entry.file.clone(), entry.labels.clone());
        }
        MonitorSet(files)
    }
}

/// Split a comma-separated flag value into labels, dropping empty items
pub fn parse_label_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// File key → ordered column labels, iterated in sorted key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSet(BTreeMap<String, Vec<String>>);

impl MonitorSet {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn labels(&self, file: &str) -> Option<&[String]> {
        self.0.get(file).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for MonitorSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|(_, v)| !v.is_empty()).collect())
    }
}
