//! External service integrations

pub mod logging;
pub mod radarr;
#[cfg(test)]
pub(crate) mod test_support;
pub mod text_utils;
pub mod trailer;
pub mod youtube;

pub use radarr::{CatalogError, Movie, MovieCatalog, RadarrClient};
pub use trailer::{DownloadOutcome, TrailerDownloader, TrailerError, TrailerService, select_format};
pub use youtube::{PlatformError, VideoFormat, VideoInfo, VideoPlatform, VideoStream, YtDlpClient};
