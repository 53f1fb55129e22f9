use anyhow::{Context, Result};
use clap::Parser;
use perf_analyzer::cli::{Cli, Command, CompareArgs, ScrapeArgs};
use perf_analyzer::config::{parse_label_list, AnalyzerConfig, MonitorGroup};
use perf_analyzer::csv_output::CsvSummaryOutput;
use perf_analyzer::host::RunSnapshot;
use perf_analyzer::prometheus::{self, PrometheusConfig};
use perf_analyzer::regression::{compare, ComparisonConfig};
use perf_analyzer::table::{CsvTableReader, MalformedPolicy};
use perf_analyzer::{json_output, scan};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status when findings were reported
const EXIT_FINDINGS: u8 = 2;

/// Initialize tracing subscriber; warnings are always shown so omitted
/// series and unmatched hosts never pass silently
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load monitor configuration and apply --proc/--blkdev/--netdev overrides
fn load_monitor_config(args: &ScrapeArgs) -> Result<AnalyzerConfig> {
    let mut config = AnalyzerConfig::load(args.config.as_deref())?;
    let overrides = [
        (MonitorGroup::Process, &args.processes),
        (MonitorGroup::Block, &args.block_devices),
        (MonitorGroup::Network, &args.net_devices),
    ];
    for (group, list) in overrides {
        if let Some(list) = list {
            config.override_labels(group, parse_label_list(list));
        }
    }
    Ok(config)
}

fn run_scrape(args: ScrapeArgs) -> Result<ExitCode> {
    if !args.pbench && !args.prometheus {
        anyhow::bail!("Nothing to scrape: pass --pbench and/or --prometheus");
    }

    let policy = if args.strict_values {
        MalformedPolicy::Fail
    } else {
        MalformedPolicy::CoerceToZero
    };
    let config = load_monitor_config(&args)?;
    let monitors = config.monitor_set();

    let mut snapshot = if args.pbench {
        scan::scrape_pbench(&args.search_dir, &monitors, policy, &CsvTableReader)?
    } else {
        RunSnapshot::default()
    };

    if args.prometheus {
        let prom_config = PrometheusConfig {
            url: args.url.clone(),
            token: args.token.clone().unwrap_or_default(),
            insecure_tls: args.insecure,
            duration: prometheus::window_from_minutes(args.duration)?,
            step: prometheus::parse_step(&args.step)?,
        };
        snapshot
            .hosts
            .push(prometheus::scrape_prometheus(prom_config, policy)?);
    }

    std::fs::create_dir_all(&args.result_dir)
        .with_context(|| format!("creating output directory {}", args.result_dir.display()))?;

    let mut csv = if args.pbench {
        CsvSummaryOutput::from_monitors(&monitors)
    } else {
        CsvSummaryOutput::default()
    };
    csv.extend_from_snapshot(&snapshot);
    let csv_path = csv.write_to_dir(&args.result_dir, &snapshot)?;
    let json_path = json_output::write_snapshot(&args.result_dir, &snapshot)?;

    eprintln!(
        "Summarized {} series on {} hosts",
        snapshot.summary_count(),
        snapshot.hosts.len()
    );
    println!("{}", csv_path.display());
    println!("{}", json_path.display());
    Ok(ExitCode::SUCCESS)
}

fn run_compare(args: CompareArgs) -> Result<ExitCode> {
    let aliases = AnalyzerConfig::load(args.config.as_deref())?.aliases;
    let config = ComparisonConfig {
        tolerance: args.tolerance,
        aliases,
    };
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    if config.aliases.is_empty() {
        tracing::debug!("no process aliases configured, kinds must match exactly");
    } else {
        tracing::debug!(aliases = config.aliases.len(), "process aliases loaded");
    }
    if config.tolerance < 0.0 {
        tracing::warn!(
            "negative tolerance {} flags every matched series",
            config.tolerance
        );
    }

    let old = json_output::read_snapshot(&args.old)?;
    let new = json_output::read_snapshot(&args.new)?;

    let report = compare(&old, &new, &config);
    for finding in &report.findings {
        println!("{}", finding);
    }
    eprint!("{}", report.coverage_summary());

    if report.has_regressions() && !args.no_fail {
        Ok(ExitCode::from(EXIT_FINDINGS))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match args.command {
        Command::Scrape(scrape) => run_scrape(scrape),
        Command::Compare(cmp) => run_compare(cmp),
    }
}
