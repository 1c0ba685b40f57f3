/*!
 * Fieldfare CLI - operational tooling for the pressure monitor
 *
 * `probe` takes one memory sample and prints it; `monitor` runs the
 * pressure monitor in the foreground against real system telemetry,
 * logging every classification and recovery.
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use fieldfare::{
    classify, logging, AppConfig, CacheStore, LogSink, MetricsSource, NotificationSink,
    RecoveryController, ResourceMonitor, SubscriberRegistry, SysinfoSource,
};

#[derive(Parser)]
#[command(name = "fieldfare")]
#[command(version, about = "Memory-pressure monitor for the Fieldfare survey client", long_about = None)]
struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Take one memory sample and print the classification
    Probe,

    /// Run the pressure monitor in the foreground until interrupted
    Monitor,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            AppConfig::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None => {
            let config = AppConfig::default();
            config.validate().context("validating default config")?;
            Ok(config)
        }
    }
}

fn build_source(config: &AppConfig) -> Arc<SysinfoSource> {
    match config.monitor.memory_limit_mb {
        Some(limit_mb) => Arc::new(SysinfoSource::with_limit_mb(limit_mb)),
        None => Arc::new(SysinfoSource::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    logging::init_logging(&config).context("initializing logging")?;

    match cli.command {
        Command::Probe => probe(&config),
        Command::Monitor => monitor(&config).await,
    }
}

fn probe(config: &AppConfig) -> anyhow::Result<()> {
    let source = build_source(config);
    match source.sample() {
        Some(stats) => {
            let severity = classify(stats.usage_percentage, &config.monitor.thresholds());
            println!(
                "used: {} MiB / limit: {} MiB ({:.1}%) -> {}",
                stats.used_bytes / (1024 * 1024),
                stats.limit_bytes / (1024 * 1024),
                stats.usage_percentage,
                severity
            );
        }
        None => println!("memory telemetry unavailable on this platform"),
    }
    Ok(())
}

async fn monitor(config: &AppConfig) -> anyhow::Result<()> {
    let source = build_source(config);
    let registry = Arc::new(SubscriberRegistry::new());
    let cache = CacheStore::new();
    let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);

    let recovery = Arc::new(RecoveryController::new(
        config.monitor.auto_recovery_enabled,
        config.monitor.min_recovery_interval(),
        Arc::clone(&registry),
        cache,
        Arc::clone(&sink),
    ));

    let monitor = ResourceMonitor::new(&config.monitor, source, recovery, sink)
        .context("building resource monitor")?;
    monitor.set_on_sample(|stats, severity| {
        info!(
            usage_pct = format!("{:.1}", stats.usage_percentage).as_str(),
            severity = %severity,
            "sample"
        );
    });

    monitor.start();
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    monitor.stop();

    let stats = monitor.stats();
    info!(
        samples = stats.samples_taken,
        skipped = stats.samples_skipped,
        warnings = stats.warnings_observed,
        criticals = stats.criticals_observed,
        recoveries = stats.recoveries_started,
        "monitor shut down"
    );
    Ok(())
}
