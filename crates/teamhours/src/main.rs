//! Teamhours Server
//!
//! Composes the team-hours services, runs them until a shutdown signal and
//! then stops them in reverse registration order.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, reload, util::SubscriberInitExt};

use teamhours::config::{AppConfig, DEFAULT_LOG_FILTER};
use teamhours::services;

/// How long services get to report healthy after `start_all`
const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// Team hours tracker
#[derive(Parser, Debug)]
#[command(name = "teamhours")]
#[command(about = "Team hours tracker", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "teamhours.toml")]
    config: PathBuf,

    /// Tracing filter (overrides the config file; RUST_LOG wins over both)
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing before loading config so config logs are visible.
    // RUST_LOG and --log pin the filter; otherwise the config may replace it.
    let pinned = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| args.log.as_deref().map(EnvFilter::new));
    let from_config = pinned.is_none();
    let (filter, filter_handle) =
        reload::Layer::new(pinned.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load(&args.config)
        .await
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?
        .with_env_overrides()?;

    if from_config {
        filter_handle
            .reload(EnvFilter::new(&config.log_filter))
            .context("Failed to apply log filter")?;
    }

    info!("Starting teamhours v{}", env!("CARGO_PKG_VERSION"));

    let registry = services::compose(&config)?;
    registry.start_all();

    for (kind, status) in services::await_healthy(&registry, STARTUP_GRACE).await {
        match status {
            Ok(()) => info!("  - {} (healthy)", kind),
            Err(e) => warn!("  - {} ({})", kind, e),
        }
    }

    shutdown_signal().await?;

    info!("Shutting down services...");
    registry
        .stop_all()
        .await
        .context("Shutdown did not complete")?;

    info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install signal handler")?;

    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = ctrl_c => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }

    Ok(())
}
