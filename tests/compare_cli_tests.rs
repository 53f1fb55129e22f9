//! `compare` subcommand: p95 tolerance checks between two out.json files
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn snapshot_json(hosts: &[(&str, &[(&str, &str, f64)])]) -> String {
    let hosts: Vec<serde_json::Value> = hosts
        .iter()
        .map(|(kind, results)| {
            let results: Vec<serde_json::Value> = results
                .iter()
                .map(|(series, resource, pct95)| {
                    serde_json::json!({
                        "Kind": series,
                        "Resource": resource,
                        "Min": 0.0,
                        "Max": pct95,
                        "Avg": pct95 / 2.0,
                        "Pct95": pct95,
                    })
                })
                .collect();
            serde_json::json!({ "Kind": kind, "Results": results })
        })
        .collect();
    serde_json::json!({ "Hosts": hosts, "Metrics": null }).to_string()
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn perf_analyzer() -> Command {
    Command::cargo_bin("perf-analyzer").unwrap()
}

#[test]
fn test_compare_identical_runs_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let json = snapshot_json(&[("svt-master-1", &[("etcd", "cpu_usage_percent_cpu", 10.0)])]);
    let old = write_file(dir.path(), "old.json", &json);
    let new = write_file(dir.path(), "new.json", &json);

    perf_analyzer()
        .arg("compare")
        .arg("--old")
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("0 of 1 compared series out of spec"));
}

#[test]
fn test_compare_reports_out_of_band_p95() {
    let dir = tempfile::tempdir().unwrap();
    let old = write_file(
        dir.path(),
        "old.json",
        &snapshot_json(&[("A", &[("httpd", "cpu", 10.0)])]),
    );
    let new = write_file(
        dir.path(),
        "new.json",
        &snapshot_json(&[("A", &[("httpd", "cpu", 10.6)])]),
    );

    perf_analyzer()
        .arg("compare")
        .arg("--old")
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "A: Out of spec httpd process with cpu, old: 10.00 => new: 10.60",
        ));
}

#[test]
fn test_compare_no_fail_exits_zero_with_findings() {
    let dir = tempfile::tempdir().unwrap();
    let old = write_file(
        dir.path(),
        "old.json",
        &snapshot_json(&[("A", &[("httpd", "cpu", 10.0)])]),
    );
    let new = write_file(
        dir.path(),
        "new.json",
        &snapshot_json(&[("A", &[("httpd", "cpu", 20.0)])]),
    );

    perf_analyzer()
        .args(["compare", "--no-fail", "--old"])
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::contains("Out of spec httpd"));
}

#[test]
fn test_compare_wider_tolerance_via_stddev_alias() {
    let dir = tempfile::tempdir().unwrap();
    let old = write_file(
        dir.path(),
        "old.json",
        &snapshot_json(&[("A", &[("httpd", "cpu", 10.0)])]),
    );
    let new = write_file(
        dir.path(),
        "new.json",
        &snapshot_json(&[("A", &[("httpd", "cpu", 10.6)])]),
    );

    perf_analyzer()
        .args(["compare", "--stddev", "0.1", "--old"])
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_compare_missing_host_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let old = write_file(
        dir.path(),
        "old.json",
        &snapshot_json(&[
            ("svt-master-1", &[("etcd", "cpu", 1.0)]),
            ("svt-node-1", &[("etcd", "cpu", 1.0)]),
        ]),
    );
    let new = write_file(
        dir.path(),
        "new.json",
        &snapshot_json(&[("svt-master-1", &[("etcd", "cpu", 1.0)])]),
    );

    perf_analyzer()
        .arg("compare")
        .arg("--old")
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .assert()
        .success()
        .stderr(predicate::str::contains("Host type svt-node-1 not found"));
}

#[test]
fn test_compare_builtin_alias_matches_renamed_process() {
    let dir = tempfile::tempdir().unwrap();
    let old = write_file(
        dir.path(),
        "old.json",
        &snapshot_json(&[("svt-node-1", &[("openshift_start_node_", "cpu", 4.0)])]),
    );
    let new = write_file(
        dir.path(),
        "new.json",
        &snapshot_json(&[("svt-node-1", &[("hyperkube_kubelet_", "cpu", 8.0)])]),
    );

    perf_analyzer()
        .arg("compare")
        .arg("--old")
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "svt-node-1: Out of spec hyperkube_kubelet_ process with cpu, old: 4.00 => new: 8.00",
        ));
}

#[test]
fn test_compare_config_without_aliases_disables_rename() {
    let dir = tempfile::tempdir().unwrap();
    let old = write_file(
        dir.path(),
        "old.json",
        &snapshot_json(&[("svt-node-1", &[("openshift_start_node_", "cpu", 4.0)])]),
    );
    let new = write_file(
        dir.path(),
        "new.json",
        &snapshot_json(&[("svt-node-1", &[("hyperkube_kubelet_", "cpu", 8.0)])]),
    );
    let config = write_file(
        dir.path(),
        "analyzer.toml",
        "[[monitor]]\nfile = \"cpu.csv\"\nlabels = [\"etcd\"]\n",
    );

    perf_analyzer()
        .arg("compare")
        .arg("--old")
        .arg(&old)
        .arg("--new")
        .arg(&new)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("not found on host svt-node-1"));
}

#[test]
fn test_compare_missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let new = write_file(dir.path(), "new.json", &snapshot_json(&[]));

    perf_analyzer()
        .arg("compare")
        .arg("--old")
        .arg(dir.path().join("missing.json"))
        .arg("--new")
        .arg(&new)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error reading file"));
}

#[test]
fn test_compare_rejects_nan_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let json = write_file(dir.path(), "s.json", &snapshot_json(&[]));

    perf_analyzer()
        .args(["compare", "--tolerance", "NaN", "--old"])
        .arg(&json)
        .arg("--new")
        .arg(&json)
        .assert()
        .failure();
}
