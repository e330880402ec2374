//! Trailer downloads into the local trailer directory
//!
//! A trailer lands at `{download_location}/{slug(title)}.mp4`. The bytes are
//! written to a `.part` sibling first and renamed into place once complete,
//! so an existing final file always means a finished download.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::radarr::Movie;
use super::text_utils::slugify;
use super::youtube::{PlatformError, VideoFormat, VideoInfo, VideoPlatform};

const TRAILER_EXTENSION: &str = "mp4";
const PARTIAL_SUFFIX: &str = "part";

#[derive(Debug, Error)]
pub enum TrailerError {
    #[error("movie {title:?} has no trailer id")]
    MissingTrailerId { title: String },

    #[error("cannot derive a file name for {title:?} (trailer id {video_id:?})")]
    NoFileName { title: String, video_id: String },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("no audio format of video {video_id} fits within {max_bytes} bytes")]
    NoSuitableFormat { video_id: String, max_bytes: u64 },

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrailerError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        TrailerError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of a successful trailer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A new file was written
    Downloaded { path: PathBuf, bytes: u64 },
    /// The destination already existed; nothing was fetched
    AlreadyPresent { path: PathBuf },
}

/// Something that can fetch the trailer for a movie
#[async_trait]
pub trait TrailerDownloader: Send + Sync {
    async fn download_trailer(&self, movie: &Movie) -> Result<DownloadOutcome, TrailerError>;
}

/// Pick the format to download.
///
/// Only direct HTTP(S) formats with audio are considered; HLS and DASH
/// entries resolve to playlists, not media. Formats that also carry video
/// win over audio-only ones, and mp4 containers win over others within that
/// group. Among what is left the largest format whose size is known and at
/// most `max_bytes` is chosen; failing that, the first format of unknown size.
pub fn select_format(video: &VideoInfo, max_bytes: u64) -> Option<&VideoFormat> {
    let candidates: Vec<&VideoFormat> = video
        .audio_formats()
        .filter(|f| f.is_direct())
        .collect();

    let muxed: Vec<&VideoFormat> = candidates.iter().copied().filter(|f| f.has_video()).collect();
    let group = if muxed.is_empty() { candidates } else { muxed };

    let mp4: Vec<&VideoFormat> = group.iter().copied().filter(|f| f.is_mp4()).collect();
    let group = if mp4.is_empty() { group } else { mp4 };

    let within_ceiling = group
        .iter()
        .copied()
        .filter(|f| matches!(f.size(), Some(size) if size <= max_bytes))
        .max_by_key(|f| f.size());

    within_ceiling.or_else(|| group.iter().copied().find(|f| f.size().is_none()))
}

fn is_plain_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Downloads trailers from a [VideoPlatform] into a directory
pub struct TrailerService {
    platform: Arc<dyn VideoPlatform>,
    download_dir: PathBuf,
    max_bytes: u64,
}

impl TrailerService {
    pub fn new(platform: Arc<dyn VideoPlatform>, download_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            platform,
            download_dir: download_dir.into(),
            max_bytes,
        }
    }

    /// Final location of a movie's trailer.
    ///
    /// Titles without any ASCII-renderable character fall back to the
    /// trailer id, kept verbatim since ids are case-sensitive.
    pub fn destination(&self, movie: &Movie) -> Result<PathBuf, TrailerError> {
        let mut stem = slugify(&movie.title);
        if stem.is_empty() {
            if !is_plain_video_id(&movie.youtube_trailer_id) {
                return Err(TrailerError::NoFileName {
                    title: movie.title.clone(),
                    video_id: movie.youtube_trailer_id.clone(),
                });
            }
            stem = movie.youtube_trailer_id.clone();
        }
        Ok(self
            .download_dir
            .join(format!("{}.{}", stem, TRAILER_EXTENSION)))
    }

    fn partial_path(destination: &Path) -> PathBuf {
        let mut name = destination.as_os_str().to_owned();
        name.push(".");
        name.push(PARTIAL_SUFFIX);
        PathBuf::from(name)
    }

    /// Stream the selected format into `partial`, returning the byte count
    async fn write_stream(
        &self,
        video: &VideoInfo,
        format: &VideoFormat,
        partial: &Path,
    ) -> Result<u64, TrailerError> {
        let mut stream = self.platform.open_stream(video, format).await?;

        let mut file = fs::File::create(partial)
            .await
            .map_err(|e| TrailerError::io("creating", partial, e))?;
        let bytes = tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(|e| TrailerError::io("writing", partial, e))?;
        file.flush()
            .await
            .map_err(|e| TrailerError::io("flushing", partial, e))?;
        file.sync_all()
            .await
            .map_err(|e| TrailerError::io("syncing", partial, e))?;

        Ok(bytes)
    }
}

#[async_trait]
impl TrailerDownloader for TrailerService {
    async fn download_trailer(&self, movie: &Movie) -> Result<DownloadOutcome, TrailerError> {
        if movie.youtube_trailer_id.is_empty() {
            return Err(TrailerError::MissingTrailerId {
                title: movie.title.clone(),
            });
        }

        let destination = self.destination(movie)?;

        match fs::try_exists(&destination).await {
            Ok(true) => {
                debug!(path = %destination.display(), "Trailer already on disk");
                return Ok(DownloadOutcome::AlreadyPresent { path: destination });
            }
            Ok(false) => {}
            Err(e) => return Err(TrailerError::io("checking", &destination, e)),
        }

        let video = self.platform.get_video(&movie.youtube_trailer_id).await?;
        let format = select_format(&video, self.max_bytes).ok_or_else(|| {
            TrailerError::NoSuitableFormat {
                video_id: video.id.clone(),
                max_bytes: self.max_bytes,
            }
        })?;

        debug!(
            title = %movie.title,
            video_title = ?video.title,
            format_id = %format.format_id,
            size = ?format.size(),
            "Selected trailer format"
        );

        let partial = Self::partial_path(&destination);
        let written = match self.write_stream(&video, format, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial trailer");
                }
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, &destination).await {
            let _ = fs::remove_file(&partial).await;
            return Err(TrailerError::io("renaming", &partial, e));
        }

        info!(
            title = %movie.title,
            path = %destination.display(),
            bytes = written,
            "Trailer downloaded"
        );

        Ok(DownloadOutcome::Downloaded {
            path: destination,
            bytes: written,
        })
    }
}
