//! Trailer hunt job
//!
//! One cycle:
//! 1. Fetches the movie list from the catalog
//! 2. Skips movies the catalog already reports as downloaded
//! 3. Attempts a trailer download for each remaining movie, up to the cap
//!
//! Once the cap is hit the rest of the list is still walked but nothing more
//! is attempted.

use tracing::{debug, info, trace, warn};

use crate::services::radarr::MovieCatalog;
use crate::services::trailer::{DownloadOutcome, TrailerDownloader};

/// Counters for one cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub movies: usize,
    pub attempted: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub failed: usize,
    pub skipped_downloaded: usize,
    pub skipped_over_cap: usize,
}

/// Whether the per-cycle download cap has been used up
pub fn cap_reached(attempted: usize, cap: usize) -> bool {
    attempted >= cap
}

/// Run a single trailer hunt over the catalog
pub async fn run_cycle(
    catalog: &dyn MovieCatalog,
    downloader: &dyn TrailerDownloader,
    max_downloads: usize,
) -> CycleReport {
    let movies = catalog.fetch_catalog().await;
    let mut report = CycleReport {
        movies: movies.len(),
        ..Default::default()
    };

    for movie in &movies {
        if cap_reached(report.attempted, max_downloads) {
            report.skipped_over_cap += 1;
            continue;
        }

        if movie.downloaded {
            trace!(title = %movie.title, "Movie already downloaded in catalog");
            report.skipped_downloaded += 1;
            continue;
        }

        info!(title = %movie.title, "Movie found");
        report.attempted += 1;

        match downloader.download_trailer(movie).await {
            Ok(DownloadOutcome::Downloaded { .. }) => report.downloaded += 1,
            Ok(DownloadOutcome::AlreadyPresent { path }) => {
                debug!(title = %movie.title, path = %path.display(), "Trailer already present");
                report.already_present += 1;
            }
            Err(e) => {
                warn!(title = %movie.title, error = %e, "Failed to download movie trailer");
                report.failed += 1;
            }
        }
    }

    report
}
