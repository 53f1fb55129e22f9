//! Prometheus range-query collaborator
//!
//! Pulls per-namespace CPU and memory series from a Prometheus (or Thanos)
//! `query_range` endpoint and summarizes them with the same
//! [`summarize_series`](crate::stats::summarize_series) used for pbench
//! tables, so both ingestion paths report identical statistics.

use crate::host::{Host, Series};
use crate::stats::summarize_series;
use crate::table::MalformedPolicy;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Host kind given to the snapshot entry built from Prometheus data
pub const PROMETHEUS_HOST_KIND: &str = "prometheus";

/// Resource name → PromQL, iterated in sorted resource order
pub const QUERIES: [(&str, &str); 2] = [
    (
        "cpu",
        r#"sum(rate(container_cpu_usage_seconds_total{job="kubelet", image!="", container!="POD"}[5m])) by (namespace)"#,
    ),
    (
        "memory",
        r#"sum(container_memory_usage_bytes{container_name!=""}) by (namespace)"#,
    ),
];

/// Connection and query-window settings
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    pub url: String,
    /// Bearer token sent on every request
    pub token: String,
    /// Accept self-signed certificates
    pub insecure_tls: bool,
    /// Length of the query window ending now
    pub duration: Duration,
    pub step: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9090".to_string(),
            token: String::new(),
            insecure_tls: false,
            duration: Duration::from_secs(30 * 60),
            step: Duration::from_secs(60),
        }
    }
}

/// Parse a step such as `30s`, `1m` or `2h` (bare numbers are seconds)
pub fn parse_step(step: &str) -> Result<Duration> {
    let step = step.trim();
    let (digits, unit) = match step.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => step.split_at(idx),
        None => (step, "s"),
    };
    let n: u64 = digits
        .parse()
        .with_context(|| format!("Error parsing step duration {}", step))?;
    let scale: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => anyhow::bail!("Error parsing step duration {}: unknown unit '{}'", step, other),
    };
    let secs = n
        .checked_mul(scale)
        .with_context(|| format!("step duration {} is too large", step))?;
    if secs == 0 {
        anyhow::bail!("step duration must be positive, got {}", step);
    }
    Ok(Duration::from_secs(secs))
}

/// Length of the query window for a test that ran `minutes` minutes
pub fn window_from_minutes(minutes: u64) -> Result<Duration> {
    let secs = minutes
        .checked_mul(60)
        .with_context(|| format!("test duration of {} minutes is too large", minutes))?;
    Ok(Duration::from_secs(secs))
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    #[serde(default)]
    result: Vec<MatrixSample>,
}

#[derive(Debug, Deserialize)]
struct MatrixSample {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Decode a `query_range` response body into one series per matrix entry
///
/// The series kind is the value of the last label (in sorted label-name
/// order), which for the built-in `by (namespace)` queries is the namespace.
/// Under [`MalformedPolicy::Fail`] a series with an unparsable sample is
/// logged and left out; the other series are still returned.
pub fn parse_matrix(
    resource: &str,
    body: &str,
    policy: MalformedPolicy,
) -> Result<Vec<Series>> {
    let response: QueryResponse =
        serde_json::from_str(body).context("decoding Prometheus response")?;

    if response.status != "success" {
        anyhow::bail!(
            "Prometheus query error ({}): {}",
            response.error_type.unwrap_or_default(),
            response.error.unwrap_or_default()
        );
    }
    let data = response
        .data
        .context("Prometheus response has no data section")?;
    if data.result_type != "matrix" {
        anyhow::bail!("Unsupported result format: {}", data.result_type);
    }

    let mut series = Vec::with_capacity(data.result.len());
    for sample in data.result {
        let kind = sample
            .metric
            .values()
            .next_back()
            .cloned()
            .unwrap_or_else(|| resource.to_string());

        let values = match sample_values(&kind, &sample.values, policy) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(resource, kind = kind.as_str(), "series omitted: {:#}", e);
                continue;
            }
        };

        series.push(Series {
            kind,
            resource: resource.to_string(),
            values,
        });
    }
    Ok(series)
}

fn sample_values(
    kind: &str,
    samples: &[(f64, String)],
    policy: MalformedPolicy,
) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(samples.len());
    for (ts, raw) in samples {
        match raw.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) if policy == MalformedPolicy::CoerceToZero => {
                tracing::debug!(kind, ts, raw = raw.as_str(), "coercing malformed sample to 0.0");
                values.push(0.0);
            }
            Err(_) => anyhow::bail!("malformed sample '{}' at {} in series {}", raw, ts, kind),
        }
    }
    Ok(values)
}

/// Blocking client for a single Prometheus endpoint
#[derive(Debug)]
pub struct PrometheusClient {
    client: Client,
    config: PrometheusConfig,
}

impl PrometheusClient {
    pub fn new(config: PrometheusConfig) -> Result<Self> {
        if config.token.is_empty() {
            anyhow::bail!("No bearer token provided for Prometheus client");
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .context("bearer token is not a valid header value")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure_tls)
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Error creating Prometheus client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v1/query_range", self.config.url.trim_end_matches('/'))
    }

    /// Run one range query over the configured window ending now
    pub fn query_range(
        &self,
        resource: &str,
        query: &str,
        policy: MalformedPolicy,
    ) -> Result<Vec<Series>> {
        let end = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before UNIX epoch")?;
        let start = end.saturating_sub(self.config.duration);

        tracing::debug!(resource, query, url = %self.endpoint(), "querying Prometheus");
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("query", query.to_string()),
                ("start", format!("{:.3}", start.as_secs_f64())),
                ("end", format!("{:.3}", end.as_secs_f64())),
                ("step", format!("{}s", self.config.step.as_secs())),
            ])
            .send()
            .with_context(|| format!("Prometheus query for {} failed", resource))?;

        let status = response.status();
        let body = response.text().context("reading Prometheus response")?;
        if !status.is_success() && !body.trim_start().starts_with('{') {
            anyhow::bail!("Prometheus query for {} failed: {}", resource, status);
        }
        parse_matrix(resource, &body, policy)
    }
}

/// Summarize every built-in query into a single [`Host`]
///
/// A failing query or series is logged and left out; the rest are kept.
pub fn scrape_prometheus(config: PrometheusConfig, policy: MalformedPolicy) -> Result<Host> {
    let client = PrometheusClient::new(config)?;
    let mut host = Host::new(PROMETHEUS_HOST_KIND, None);

    for (resource, query) in QUERIES {
        let series = match client.query_range(resource, query, policy) {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(resource, "Prometheus query skipped: {:#}", e);
                continue;
            }
        };
        push_summaries(&mut host, &series);
    }
    Ok(host)
}

fn push_summaries(host: &mut Host, series: &[Series]) {
    for s in series {
        match summarize_series(s) {
            Ok(summary) => host.summaries.push(summary),
            Err(e) => tracing::warn!(
                kind = s.kind.as_str(),
                resource = s.resource.as_str(),
                "series omitted: {}",
                e
            ),
        }
    }
}
