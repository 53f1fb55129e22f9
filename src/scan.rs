//! pbench result-tree discovery
//!
//! A pbench `tools-default` directory holds one subdirectory per monitored
//! host, named `<host-kind>:<benchmark-id>` (e.g.
//! `svt-master-1:pbench-benchmark-001`). Each host directory contains the
//! per-tool CSV files somewhere below it.

use crate::config::MonitorSet;
use crate::host::{aggregate, Host, RunSnapshot, TableFile};
use crate::run_metrics;
use crate::table::{MalformedPolicy, TableReader};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Prefix of every host result directory name; the matched role letter
/// covers master, infra, node, lb, etcd and compute hosts.
pub const HOST_DIR_PATTERN: &str = r"svt[_-][ceilmn]\w*[_-]\d";

/// A host result directory found under the search directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDir {
    /// Directory name up to the first `:`
    pub kind: String,
    pub path: PathBuf,
}

/// List host result directories directly under `search_dir`, sorted by name
///
/// # Errors
/// Fails when `search_dir` cannot be read; without it there is nothing to
/// scrape.
pub fn discover_hosts(search_dir: &Path) -> Result<Vec<HostDir>> {
    let host_re = Regex::new(HOST_DIR_PATTERN).context("compiling host directory pattern")?;

    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(search_dir)
        .with_context(|| format!("reading search directory {}", search_dir.display()))?
    {
        let entry = entry.with_context(|| format!("listing {}", search_dir.display()))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() && host_re.is_match(&name) {
            entries.push((name, path));
        }
    }
    entries.sort();

    Ok(entries
        .into_iter()
        .map(|(name, path)| HostDir {
            kind: name.split(':').next().unwrap_or_default().to_string(),
            path,
        })
        .collect())
}

/// Recursively find files under `dir` whose name matches `pattern`
///
/// Results are sorted so repeated scans of the same tree agree. Symlinks are
/// not followed. An unreadable entry below `dir` is logged and skipped; only
/// an unreadable `dir` itself is an error.
pub fn find_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let re = Regex::new(pattern)
        .with_context(|| format!("invalid monitored file pattern '{}'", pattern))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("reading {}", dir.display()));
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        if re.is_match(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Resource name recorded for summaries from `file_key`
pub fn resource_name(file_key: &str) -> String {
    file_key
        .strip_suffix(".csv")
        .unwrap_or(file_key)
        .to_string()
}

/// Tables to aggregate for one host, in sorted file-key then path order
pub fn table_files(host_dir: &Path, monitors: &MonitorSet) -> Vec<TableFile> {
    let mut files = Vec::new();
    for (key, labels) in monitors.iter() {
        let found = match find_files(host_dir, key) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(host_dir = %host_dir.display(), file = key, "{:#}", e);
                continue;
            }
        };
        if found.is_empty() {
            tracing::warn!(
                host_dir = %host_dir.display(),
                file = key,
                "monitored file not found, {} series omitted",
                labels.len()
            );
        }
        for path in found {
            files.push(TableFile {
                path,
                resource: resource_name(key),
                labels: labels.to_vec(),
            });
        }
    }
    files
}

/// Scrape every host under `search_dir` into a snapshot
///
/// Run metrics from `result.txt` are attached when available; their absence
/// is only a warning.
pub fn scrape_pbench<R: TableReader + ?Sized>(
    search_dir: &Path,
    monitors: &MonitorSet,
    policy: MalformedPolicy,
    reader: &R,
) -> Result<RunSnapshot> {
    let host_dirs = discover_hosts(search_dir)?;
    if host_dirs.is_empty() {
        tracing::warn!(
            search_dir = %search_dir.display(),
            "no host directories matching {}",
            HOST_DIR_PATTERN
        );
    }

    let hosts: Vec<Host> = host_dirs
        .iter()
        .map(|dir| {
            let files = table_files(&dir.path, monitors);
            aggregate(
                &dir.kind,
                Some(dir.path.display().to_string()),
                &files,
                policy,
                reader,
            )
        })
        .collect();

    let mut snapshot = RunSnapshot::new(hosts);
    match run_metrics::read_metrics(search_dir) {
        Ok(metrics) => {
            for metric in &metrics {
                tracing::info!(
                    marker = metric.marker.as_str(),
                    "test duration {:?}",
                    metric.duration()
                );
            }
            snapshot.metrics = metrics;
        }
        Err(e) => tracing::warn!("Error getting metrics: {:#}", e),
    }
    Ok(snapshot)
}
