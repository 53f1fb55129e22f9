//! CLI argument parsing for perf-analyzer

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "perf-analyzer")]
#[command(version)]
#[command(
    about = "Summarize pbench/Prometheus host metrics and compare p95 between runs",
    long_about = None
)]
pub struct Cli {
    /// Enable debug logging (trace level, overrides RUST_LOG)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize a pbench result tree and/or a Prometheus endpoint into out.csv/out.json
    Scrape(ScrapeArgs),
    /// Compare two out.json snapshots and report p95 values outside the tolerance band
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Scrape pbench results
    #[arg(long)]
    pub pbench: bool,

    /// Scrape a Prometheus endpoint
    #[arg(long)]
    pub prometheus: bool,

    /// pbench run result directory to parse
    #[arg(
        short = 'i',
        long = "input",
        value_name = "DIR",
        default_value = "/var/lib/pbench-agent/benchmark_result/tools-default/"
    )]
    pub search_dir: PathBuf,

    /// Output directory for out.csv and out.json
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "/tmp/")]
    pub result_dir: PathBuf,

    /// Comma-separated process names to gather (replaces the configured list)
    #[arg(long = "proc", value_name = "LIST")]
    pub processes: Option<String>,

    /// Comma-separated block devices (replaces the configured list)
    #[arg(long = "blkdev", value_name = "LIST")]
    pub block_devices: Option<String>,

    /// Comma-separated network devices (replaces the configured list)
    #[arg(long = "netdev", value_name = "LIST")]
    pub net_devices: Option<String>,

    /// TOML file with monitored files and aliases (replaces built-in defaults)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Drop a series with a non-numeric cell instead of reading it as 0
    #[arg(long = "strict-values")]
    pub strict_values: bool,

    /// URL for Prometheus connection
    #[arg(long, value_name = "URL", default_value = "http://localhost:9090")]
    pub url: String,

    /// Bearer token for the Prometheus endpoint
    #[arg(long, value_name = "TOKEN", env = "PERF_ANALYZER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Trust self-signed HTTPS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Test duration in minutes (query window ends now)
    #[arg(long, value_name = "MINUTES", default_value = "30")]
    pub duration: u64,

    /// Query resolution step (e.g. 30s, 1m)
    #[arg(long, value_name = "STEP", default_value = "1m")]
    pub step: String,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Previous run summary (out.json)
    #[arg(long, value_name = "FILE")]
    pub old: PathBuf,

    /// New run summary (out.json)
    #[arg(long, value_name = "FILE")]
    pub new: PathBuf,

    /// Allowed fractional p95 deviation (0.05 = 5%)
    #[arg(
        long,
        visible_alias = "stddev",
        value_name = "FRACTION",
        default_value = "0.05",
        allow_negative_numbers = true
    )]
    pub tolerance: f64,

    /// TOML file whose [aliases] table replaces the built-in process aliases
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit 0 even when findings are reported
    #[arg(long = "no-fail")]
    pub no_fail: bool,
}
