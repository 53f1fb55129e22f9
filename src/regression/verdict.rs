// Tolerance check and report assembly for run comparison

use crate::error::AnalyzerError;
use crate::host::RunSnapshot;
use crate::regression::config::ComparisonConfig;
use crate::regression::matching::{find_host, find_summary};
use std::fmt;

/// A matched series whose new p95 fell outside the tolerance band
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// Kind of the host in the new run
    pub host_kind: String,
    /// Kind of the series in the new run (may be the alias of the old kind)
    pub series_kind: String,
    pub resource: String,
    pub old_pct95: f64,
    pub new_pct95: f64,
}

impl Finding {
    /// `(new - old) / old`; infinite when the old value was zero
    pub fn relative_change(&self) -> f64 {
        (self.new_pct95 - self.old_pct95) / self.old_pct95
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Out of spec {} process with {}, old: {:.2} => new: {:.2}",
            self.host_kind, self.series_kind, self.resource, self.old_pct95, self.new_pct95
        )
    }
}

/// True when `new` lies outside the relative band around `old`
///
/// For `old >= 0` the bounds are `old*(1+t)` and `old*(1-t)`, evaluated in
/// that exact form so values sitting on a bound stay in band. A negative
/// `old` uses `old ± |old|*t` so an identical value stays inside its own
/// band. A negative tolerance gives an empty band, so every pair with a
/// non-zero old value is out of band.
pub fn out_of_band(old: f64, new: f64, tolerance: f64) -> bool {
    if old >= 0.0 {
        new > old * (1.0 + tolerance) || new < old * (1.0 - tolerance)
    } else {
        let slack = -old * tolerance;
        new > old + slack || new < old - slack
    }
}

/// Outcome of comparing two snapshots
#[derive(Debug, Clone, Default)]
pub struct ComparisonReport {
    /// Every tolerance violation, in old-run host then series order
    pub findings: Vec<Finding>,
    /// Old hosts or series with no counterpart in the new run
    /// ([`AnalyzerError::HostNotMatched`] / [`AnalyzerError::SeriesNotMatched`])
    pub mismatches: Vec<AnalyzerError>,
    /// Number of series pairs that were matched and checked
    pub compared: usize,
    pub tolerance: f64,
}

impl ComparisonReport {
    pub fn has_regressions(&self) -> bool {
        !self.findings.is_empty()
    }

    /// Counts plus every unmatched host/series, without the finding lines
    pub fn coverage_summary(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!(
            "{} of {} compared series out of spec (tolerance {})\n",
            self.findings.len(),
            self.compared,
            self.tolerance
        ));

        if !self.mismatches.is_empty() {
            report.push_str(&format!(
                "{} unmatched from old run (not compared):\n",
                self.mismatches.len()
            ));
            for mismatch in &self.mismatches {
                report.push_str(&format!("  - {}\n", mismatch));
            }
        }

        report
    }
}

/// Compare the p95 of every series in `old` against its counterpart in `new`
///
/// Never stops at the first violation. Hosts and series that cannot be
/// matched are logged, recorded in [`ComparisonReport::mismatches`] and
/// contribute no findings. Only `pct95` is compared.
///
/// # Example
/// ```
/// use perf_analyzer::host::{Host, RunSnapshot, SeriesSummary};
/// use perf_analyzer::regression::{compare, ComparisonConfig};
///
/// let host = |pct95| {
///     let mut h = Host::new("A", None);
///     h.summaries.push(SeriesSummary {
///         kind: "httpd".into(), resource: "cpu".into(),
///         min: 0.0, max: pct95, avg: pct95, pct95, path: None,
///     });
///     RunSnapshot::new(vec![h])
/// };
///
/// let report = compare(&host(10.0), &host(10.6), &ComparisonConfig::default());
/// assert_eq!(report.findings.len(), 1);
/// assert_eq!(report.findings[0].new_pct95, 10.6);
/// ```
pub fn compare(
    old: &RunSnapshot,
    new: &RunSnapshot,
    config: &ComparisonConfig,
) -> ComparisonReport {
    let mut report = ComparisonReport {
        tolerance: config.tolerance,
        ..ComparisonReport::default()
    };

    for old_host in &old.hosts {
        let Some(new_host) = find_host(&new.hosts, &old_host.kind) else {
            let mismatch = AnalyzerError::HostNotMatched {
                host_kind: old_host.kind.clone(),
            };
            tracing::warn!("{}", mismatch);
            report.mismatches.push(mismatch);
            continue;
        };

        for old_summary in &old_host.summaries {
            let Some(new_summary) = find_summary(new_host, old_summary, &config.aliases) else {
                let mismatch = AnalyzerError::SeriesNotMatched {
                    host_kind: old_host.kind.clone(),
                    series_kind: old_summary.kind.clone(),
                    resource: old_summary.resource.clone(),
                };
                tracing::warn!("{}", mismatch);
                report.mismatches.push(mismatch);
                continue;
            };

            report.compared += 1;
            if out_of_band(old_summary.pct95, new_summary.pct95, config.tolerance) {
                let finding = Finding {
                    host_kind: new_host.kind.clone(),
                    series_kind: new_summary.kind.clone(),
                    resource: new_summary.resource.clone(),
                    old_pct95: old_summary.pct95,
                    new_pct95: new_summary.pct95,
                };
                tracing::info!(
                    host = finding.host_kind.as_str(),
                    kind = finding.series_kind.as_str(),
                    resource = finding.resource.as_str(),
                    "p95 changed by {:+.1}%",
                    finding.relative_change() * 100.0
                );
                report.findings.push(finding);
            }
        }
    }

    tracing::debug!(
        compared = report.compared,
        findings = report.findings.len(),
        mismatches = report.mismatches.len(),
        "comparison finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_band_edges() {
        // band [9.5, 10.5]
        assert!(!out_of_band(10.0, 10.0, 0.05));
        assert!(!out_of_band(10.0, 10.5, 0.05));
        assert!(!out_of_band(10.0, 9.5, 0.05));
        assert!(out_of_band(10.0, 10.6, 0.05));
        assert!(out_of_band(10.0, 9.4, 0.05));
    }

    #[test]
    fn test_out_of_band_bounds_are_inclusive_for_small_baselines() {
        for (old, t) in [(0.51, 0.05), (0.53, 0.05), (0.53, 0.1), (1234.56, 0.03)] {
            assert!(!out_of_band(old, old * (1.0 + t), t), "upper bound of {old}");
            assert!(!out_of_band(old, old * (1.0 - t), t), "lower bound of {old}");
        }
        assert!(!out_of_band(0.51, 0.5355000000000001, 0.05));
        assert!(!out_of_band(0.53, 0.5035, 0.05));
    }

    #[test]
    fn test_out_of_band_bounds_sweep() {
        for i in 1..20_000u32 {
            let old = f64::from(i) / 100.0;
            for t in [0.01, 0.03, 0.05, 0.1, 0.15, 0.2] {
                assert!(!out_of_band(old, old * (1.0 + t), t));
                assert!(!out_of_band(old, old * (1.0 - t), t));
            }
        }
    }

    #[test]
    fn test_out_of_band_negative_baseline_keeps_identical_value() {
        assert!(!out_of_band(-4.0, -4.0, 0.05));
        assert!(!out_of_band(-4.0, -4.1, 0.05));
        assert!(out_of_band(-4.0, -4.5, 0.05));
        assert!(out_of_band(-4.0, -3.5, 0.05));
    }

    #[test]
    fn test_out_of_band_zero_tolerance() {
        assert!(!out_of_band(3.0, 3.0, 0.0));
        assert!(out_of_band(3.0, 3.000001, 0.0));
    }

    #[test]
    fn test_out_of_band_negative_tolerance_always_flags() {
        assert!(out_of_band(10.0, 10.0, -0.01));
        assert!(out_of_band(2.5, 2.5, -0.5));
    }

    #[test]
    fn test_out_of_band_zero_baseline() {
        assert!(!out_of_band(0.0, 0.0, 0.05));
        assert!(out_of_band(0.0, 0.01, 0.05));
    }

    #[test]
    fn test_finding_display_format() {
        let finding = Finding {
            host_kind: "svt-master-1".to_string(),
            series_kind: "etcd".to_string(),
            resource: "cpu_usage_percent_cpu".to_string(),
            old_pct95: 10.0,
            new_pct95: 10.6,
        };
        assert_eq!(
            finding.to_string(),
            "svt-master-1: Out of spec etcd process with cpu_usage_percent_cpu, old: 10.00 => new: 10.60"
        );
    }

    #[test]
    fn test_relative_change() {
        let finding = Finding {
            host_kind: "A".to_string(),
            series_kind: "httpd".to_string(),
            resource: "cpu".to_string(),
            old_pct95: 10.0,
            new_pct95: 12.0,
        };
        assert!((finding.relative_change() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_coverage_summary_lists_counts_and_mismatches() {
        let report = ComparisonReport {
            findings: vec![Finding {
                host_kind: "A".to_string(),
                series_kind: "httpd".to_string(),
                resource: "cpu".to_string(),
                old_pct95: 1.0,
                new_pct95: 2.0,
            }],
            mismatches: vec![AnalyzerError::HostNotMatched {
                host_kind: "B".to_string(),
            }],
            compared: 3,
            tolerance: 0.05,
        };
        let text = report.coverage_summary();
        assert!(!text.contains("Out of spec httpd"));
        assert!(text.contains("1 of 3 compared series out of spec"));
        assert!(text.contains("Host type B not found"));
    }
}
