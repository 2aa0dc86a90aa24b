//! Lookout daemon
//!
//! Runs the monitoring engine in the foreground, or performs a one-off
//! check, export or retention sweep.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lookout_engine::{
    init_tracing, EngineConfig, EngineResult, FileExportSink, MonitoringEngine, SECS_PER_DAY,
};
use tracing::info;

/// Lookout daemon CLI
#[derive(Parser)]
#[command(name = "lookoutd")]
#[command(about = "Lookout - monitoring and alerting for local data tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LOOKOUT_CONFIG")]
    config: Option<String>,

    /// Override the storage directory
    #[arg(long, env = "LOOKOUT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOOKOUT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "LOOKOUT_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the engine until Ctrl-C (default)
    Run,

    /// Run one monitoring cycle and print the system status
    Check,

    /// Write a monitoring export to a file
    Export {
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove persisted artifacts past the retention window
    Cleanup {
        /// Retention in days (defaults to the configured value)
        #[arg(long)]
        retention_days: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    init_tracing(&config.logging);

    let engine = MonitoringEngine::new(config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            engine.initialize().await?;
            engine.start()?;

            println!(
                "lookoutd {} monitoring {} (Ctrl-C to stop)",
                env!("CARGO_PKG_VERSION"),
                engine.config().storage.data_dir.display()
            );

            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received");
            engine.stop();
        }
        Command::Check => {
            engine.initialize().await?;
            let report = engine.run_cycle().await;
            info!(
                checks = report.checks.len(),
                failed = report.failed_checks(),
                alerts = report.evaluation.triggered.len(),
                "Cycle complete"
            );
            println!("{}", serde_json::to_string_pretty(&engine.status().await)?);
        }
        Command::Export { output } => {
            engine.initialize().await?;
            engine.export_data(Some(&FileExportSink::new(&output))).await?;
            println!("Exported monitoring data to {}", output.display());
        }
        Command::Cleanup { retention_days } => {
            let retention = match retention_days {
                Some(days) => Duration::from_secs(days.saturating_mul(SECS_PER_DAY)),
                None => engine.config().monitoring.retention(),
            };
            let report = engine.cleanup_old_data(retention).await?;
            println!(
                "Removed {} alert artifacts and {} metric artifacts older than {}",
                report.alerts_removed,
                report.metrics_removed,
                report.cutoff.to_rfc3339()
            );
        }
    }

    Ok(())
}
