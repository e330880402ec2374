//! Scavenge - trailer downloader for Radarr libraries
//!
//! Entry point: loads configuration, installs logging and runs the trailer
//! hunt loop until the process is asked to stop.

use std::sync::Arc;

use scavenge::config::{Config, LogFormat};
use scavenge::jobs::{self, SchedulerConfig};
use scavenge::services::{RadarrClient, TrailerService, YtDlpClient, logging};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logging goes first so configuration problems are reported
    logging::init(LogFormat::from_env())?;

    let config = Arc::new(Config::from_env()?);

    info!("Hello, Captain.");
    info!(
        radarr_url = %config.radarr_url,
        download_location = %config.download_location,
        sleep_secs = config.sleep_time.as_secs(),
        max_downloads_per_cycle = config.max_downloads_per_cycle,
        "Configuration loaded"
    );

    if config.radarr_url.is_empty() {
        warn!("RADARR_URL is not set; catalog requests will fail");
    }

    let catalog = RadarrClient::new(config.radarr_url.clone(), config.radarr_key.clone());
    let platform = Arc::new(YtDlpClient::new(config.ytdlp_path.clone()));
    let trailers = TrailerService::new(
        platform,
        config.download_location.clone(),
        config.trailer_max_bytes,
    );

    let scheduler = SchedulerConfig {
        sleep_time: config.sleep_time,
        max_downloads_per_cycle: config.max_downloads_per_cycle,
    };

    let cycles = jobs::run_forever(&catalog, &trailers, scheduler, shutdown_signal()).await;
    info!(cycles, "Scavenge stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
