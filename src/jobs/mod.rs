//! Background job loop

pub mod trailer_hunt;

use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::services::radarr::MovieCatalog;
use crate::services::trailer::TrailerDownloader;

pub use trailer_hunt::{CycleReport, cap_reached, run_cycle};

/// Scheduling parameters for the trailer hunt
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub sleep_time: Duration,
    pub max_downloads_per_cycle: usize,
}

/// Run trailer hunts back to back, sleeping between them, until `shutdown`
/// resolves. Returns the number of completed cycles.
pub async fn run_forever<S>(
    catalog: &dyn MovieCatalog,
    downloader: &dyn TrailerDownloader,
    config: SchedulerConfig,
    shutdown: S,
) -> u64
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0u64;

    loop {
        tokio::select! {
            report = run_cycle(catalog, downloader, config.max_downloads_per_cycle) => {
                cycles += 1;
                info!(
                    cycle = cycles,
                    movies = report.movies,
                    attempted = report.attempted,
                    downloaded = report.downloaded,
                    already_present = report.already_present,
                    failed = report.failed,
                    skipped_downloaded = report.skipped_downloaded,
                    skipped_over_cap = report.skipped_over_cap,
                    next_run_in_secs = config.sleep_time.as_secs(),
                    "See you next time"
                );
            }
            _ = &mut shutdown => {
                info!("Shutdown requested during trailer hunt");
                return cycles;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(config.sleep_time) => {}
            _ = &mut shutdown => {
                info!("Shutdown requested while sleeping");
                return cycles;
            }
        }
    }
}
