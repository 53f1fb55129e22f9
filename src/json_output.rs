//! Structured snapshot persistence (`out.json`)
//!
//! This is the format `compare` reads back. JSON has no NaN, so every
//! summary with a non-finite component is removed before writing by
//! [`drop_non_finite`]; such a series "could not be computed" and is left
//! out rather than persisted as a misleading number.

use crate::host::{Host, RunSnapshot};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File name written into the output directory
pub const JSON_FILE_NAME: &str = "out.json";

/// Persistence filter stage: drop non-finite summaries and host result dirs
///
/// Every host is kept, even if all of its summaries are dropped, so host
/// coverage stays visible to the comparison.
pub fn drop_non_finite(snapshot: &RunSnapshot) -> RunSnapshot {
    let hosts = snapshot
        .hosts
        .iter()
        .map(|host| {
            let (kept, dropped): (Vec<_>, Vec<_>) =
                host.summaries.iter().cloned().partition(|s| s.is_finite());
            for s in &dropped {
                tracing::warn!(
                    host = host.kind.as_str(),
                    kind = s.kind.as_str(),
                    resource = s.resource.as_str(),
                    path = ?s.path,
                    "dropping non-finite summary from structured output"
                );
            }
            Host {
                kind: host.kind.clone(),
                result_dir: None,
                summaries: kept,
            }
        })
        .collect();

    RunSnapshot {
        hosts,
        metrics: snapshot.metrics.clone(),
    }
}

/// Serialize `snapshot` (after filtering) as pretty JSON
pub fn to_json_string(snapshot: &RunSnapshot) -> Result<String> {
    serde_json::to_string_pretty(&drop_non_finite(snapshot)).context("serializing snapshot")
}

/// Write `out.json` into `result_dir`, returning its path
pub fn write_snapshot(result_dir: &Path, snapshot: &RunSnapshot) -> Result<PathBuf> {
    let path = result_dir.join(JSON_FILE_NAME);
    let json = to_json_string(snapshot)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote JSON snapshot");
    Ok(path)
}

/// Load a snapshot previously written by [`write_snapshot`] (or by the Go
/// scraper)
pub fn read_snapshot(path: &Path) -> Result<RunSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Error reading file \"{}\"", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Error parsing snapshot \"{}\"", path.display()))
}
