//! CarMonitor - CLI entry point
//!
//! Starts the monitor, waits for a signal (or `--duration-ms`), cancels every
//! task and waits for them to stop.

use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use carmonitor::cli::Cli;
use carmonitor::config::Config;
use carmonitor::{CarMonitor, SimulatedCar};

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for SIGINT/SIGTERM, or for `duration` if given
async fn wait_for_shutdown(duration: Option<Duration>) -> Result<()> {
    let timer = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = timer => info!("Run duration elapsed"),
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = timer => info!("Run duration elapsed"),
            result = tokio::signal::ctrl_c() => {
                result?;
                warn!("Ctrl+C received");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    if let Some(output) = cli.output {
        config.output.path = output;
    }
    if cli.quiet {
        config.output.console = false;
    }
    debug!(?config, "main: effective configuration");

    let cancel = CancellationToken::new();
    let monitor = CarMonitor::start(&config, SimulatedCar::new(), cancel.clone()).context("Failed to start monitor")?;
    info!("Monitor running. Press Ctrl+C to stop.");

    wait_for_shutdown(cli.duration_ms.map(Duration::from_millis)).await?;

    info!("Shutting down...");
    cancel.cancel();
    monitor.join().await?;

    eprintln!("{} Stopped, telemetry in {}", "✓".green(), config.output.path.display().to_string().cyan());
    Ok(())
}
