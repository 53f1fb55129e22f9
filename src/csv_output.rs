//! Tabular snapshot rendering for spreadsheet review
//!
//! Layout of `out.csv`:
//!
//! ```text
//! ,cpu_usage_percent_cpu,cpu_usage_percent_cpu,disk_IOPS
//! ,etcd,crio,sda-write
//! min
//! svt-master-1,1.00,0.50,10.00
//! svt-node-1,2.00,0.25,
//! mean
//! ...
//! ```
//!
//! One block per statistic (min, mean, p95, max), one row per host in
//! snapshot order. Cells are looked up by (resource, label), so a series a
//! host is missing leaves an empty cell instead of shifting its neighbours.

use crate::config::MonitorSet;
use crate::host::{Host, RunSnapshot, SeriesSummary};
use crate::scan::resource_name;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// File name written into the output directory
pub const CSV_FILE_NAME: &str = "out.csv";

/// Statistic blocks, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Min,
    Mean,
    P95,
    Max,
}

impl Stat {
    pub const ALL: [Stat; 4] = [Stat::Min, Stat::Mean, Stat::P95, Stat::Max];

    pub fn label(self) -> &'static str {
        match self {
            Stat::Min => "min",
            Stat::Mean => "mean",
            Stat::P95 => "p95",
            Stat::Max => "max",
        }
    }

    fn value(self, summary: &SeriesSummary) -> f64 {
        match self {
            Stat::Min => summary.min,
            Stat::Mean => summary.avg,
            Stat::P95 => summary.pct95,
            Stat::Max => summary.max,
        }
    }
}

/// A (resource, label) column of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumn {
    pub resource: String,
    pub label: String,
}

/// CSV output formatter for a run snapshot
#[derive(Debug, Default)]
pub struct CsvSummaryOutput {
    columns: Vec<CsvColumn>,
}

impl CsvSummaryOutput {
    /// Columns for every monitored file and label, in sorted file order
    pub fn from_monitors(monitors: &MonitorSet) -> Self {
        let columns = monitors
            .iter()
            .flat_map(|(key, labels)| {
                let resource = resource_name(key);
                labels.iter().map(move |label| CsvColumn {
                    resource: resource.clone(),
                    label: label.clone(),
                })
            })
            .collect();
        Self { columns }
    }

    /// Append a column for every (resource, kind) in `snapshot` not yet covered
    pub fn extend_from_snapshot(&mut self, snapshot: &RunSnapshot) {
        for summary in snapshot.hosts.iter().flat_map(|h| &h.summaries) {
            let covered = self
                .columns
                .iter()
                .any(|c| c.resource == summary.resource && c.label == summary.kind);
            if !covered {
                self.columns.push(CsvColumn {
                    resource: summary.resource.clone(),
                    label: summary.kind.clone(),
                });
            }
        }
    }

    pub fn columns(&self) -> &[CsvColumn] {
        &self.columns
    }

    /// The two header rows: resources, then cleaned labels
    fn header(&self) -> [Vec<String>; 2] {
        let clean = Regex::new(r"[^\w|-]+").ok();
        let mut resources = vec![String::new()];
        let mut labels = vec![String::new()];
        for column in &self.columns {
            resources.push(column.resource.clone());
            labels.push(match &clean {
                Some(re) => re.replace_all(&column.label, "").into_owned(),
                None => column.label.clone(),
            });
        }
        [resources, labels]
    }

    /// One statistic row for `host`
    fn format_host(&self, host: &Host, stat: Stat) -> Vec<String> {
        let mut row = Vec::with_capacity(self.columns.len() + 1);
        row.push(host.kind.clone());
        for column in &self.columns {
            let cell = host
                .summaries
                .iter()
                .find(|s| s.resource == column.resource && s.kind == column.label)
                .map(|s| format!("{:.2}", stat.value(s)))
                .unwrap_or_default();
            row.push(cell);
        }
        row
    }

    /// Render `snapshot` as CSV text
    pub fn to_csv(&self, snapshot: &RunSnapshot) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        for row in self.header() {
            writer.write_record(&row)?;
        }
        for stat in Stat::ALL {
            writer.write_record([stat.label()])?;
            for host in &snapshot.hosts {
                writer.write_record(self.format_host(host, stat))?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing CSV output: {}", e.error()))?;
        String::from_utf8(bytes).context("CSV output is not UTF-8")
    }

    /// Write `out.csv` into `result_dir`, returning its path
    pub fn write_to_dir(&self, result_dir: &Path, snapshot: &RunSnapshot) -> Result<PathBuf> {
        let path = result_dir.join(CSV_FILE_NAME);
        let csv = self.to_csv(snapshot)?;
        std::fs::write(&path, csv).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote CSV summary");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(kind: &str, resource: &str, base: f64) -> SeriesSummary {
        SeriesSummary {
            kind: kind.to_string(),
            resource: resource.to_string(),
            min: base,
            max: base * 4.0,
            avg: base * 2.0,
            pct95: base * 3.0,
            path: None,
        }
    }

    fn monitors() -> MonitorSet {
        [
            (
                "cpu_usage_percent_cpu.csv".to_string(),
                vec!["etcd".to_string(), "systemd_--switched-root".to_string()],
            ),
            ("disk_IOPS.csv".to_string(), vec!["sda-write".to_string()]),
        ]
        .into_iter()
        .collect()
    }

    fn snapshot() -> RunSnapshot {
        let mut master = Host::new("svt-master-1", None);
        master.summaries = vec![
            summary("etcd", "cpu_usage_percent_cpu", 1.0),
            summary("systemd_--switched-root", "cpu_usage_percent_cpu", 0.5),
            summary("sda-write", "disk_IOPS", 10.0),
        ];
        let mut node = Host::new("svt-node-1", None);
        node.summaries = vec![summary("sda-write", "disk_IOPS", 2.0)];
        RunSnapshot::new(vec![master, node])
    }

    #[test]
    fn test_header_rows() {
        let output = CsvSummaryOutput::from_monitors(&monitors());
        let [resources, labels] = output.header();
        assert_eq!(
            resources,
            vec!["", "cpu_usage_percent_cpu", "cpu_usage_percent_cpu", "disk_IOPS"]
        );
        assert_eq!(labels, vec!["", "etcd", "systemd_--switched-root", "sda-write"]);
    }

    #[test]
    fn test_header_cleans_label_punctuation() {
        let monitors: MonitorSet = [(
            "cpu_usage_percent_cpu.csv".to_string(),
            vec!["prometheus_.*".to_string()],
        )]
        .into_iter()
        .collect();
        let [_, labels] = CsvSummaryOutput::from_monitors(&monitors).header();
        assert_eq!(labels[1], "prometheus_");
    }

    #[test]
    fn test_to_csv_layout() {
        let output = CsvSummaryOutput::from_monitors(&monitors());
        let csv = output.to_csv(&snapshot()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], ",cpu_usage_percent_cpu,cpu_usage_percent_cpu,disk_IOPS");
        assert_eq!(lines[1], ",etcd,systemd_--switched-root,sda-write");
        assert_eq!(lines[2], "min");
        assert_eq!(lines[3], "svt-master-1,1.00,0.50,10.00");
        assert_eq!(lines[4], "svt-node-1,,,2.00");
        assert_eq!(lines[5], "mean");
        assert_eq!(lines[8], "p95");
        assert_eq!(lines[9], "svt-master-1,3.00,1.50,30.00");
        assert_eq!(lines[11], "max");
        assert_eq!(lines.len(), 14);
    }

    #[test]
    fn test_to_csv_is_stable() {
        let output = CsvSummaryOutput::from_monitors(&monitors());
        assert_eq!(
            output.to_csv(&snapshot()).unwrap(),
            output.to_csv(&snapshot()).unwrap()
        );
    }

    #[test]
    fn test_extend_from_snapshot_adds_uncovered_series() {
        let mut output = CsvSummaryOutput::from_monitors(&monitors());
        let mut snap = snapshot();
        let mut prom = Host::new("prometheus", None);
        prom.summaries.push(summary("openshift-monitoring", "cpu", 0.2));
        snap.hosts.push(prom);

        output.extend_from_snapshot(&snap);
        assert_eq!(output.columns().len(), 4);
        assert_eq!(
            output.columns()[3],
            CsvColumn {
                resource: "cpu".to_string(),
                label: "openshift-monitoring".to_string()
            }
        );
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output = CsvSummaryOutput::from_monitors(&monitors());
        let path = output.write_to_dir(dir.path(), &snapshot()).unwrap();
        assert_eq!(path.file_name().unwrap(), CSV_FILE_NAME);
        assert!(std::fs::read_to_string(path).unwrap().starts_with(','));
    }
}
