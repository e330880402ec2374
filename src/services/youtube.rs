//! YouTube access through the `yt-dlp` executable
//!
//! `yt-dlp --dump-single-json` resolves a video id into its list of formats;
//! the bytes of the chosen format are then streamed directly over HTTP.

use std::collections::HashMap;
use std::pin::Pin;
use std::process::Stdio;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::process::Command;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Readable byte stream of one video format
pub type VideoStream = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata lookup for {video_id} failed ({status}): {stderr}")]
    Lookup {
        video_id: String,
        status: String,
        stderr: String,
    },

    #[error("failed to decode metadata for {video_id}: {source}")]
    Metadata {
        video_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("format {format_id} has no stream URL")]
    NoStreamUrl { format_id: String },

    #[error("stream request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("stream request answered with status {0}")]
    Status(reqwest::StatusCode),
}

/// Resolved video metadata
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<VideoFormat>,
}

/// One downloadable rendition of a video, as described by yt-dlp
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoFormat {
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    /// Download protocol, e.g. `https` or `m3u8_native`
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

fn codec_present(codec: &Option<String>) -> bool {
    matches!(codec.as_deref(), Some(c) if !c.is_empty() && c != "none")
}

impl VideoFormat {
    pub fn has_audio(&self) -> bool {
        codec_present(&self.acodec)
    }

    pub fn has_video(&self) -> bool {
        codec_present(&self.vcodec)
    }

    /// Plain HTTP(S) download whose URL yields the media bytes themselves.
    /// HLS and DASH formats point at playlists instead.
    pub fn is_direct(&self) -> bool {
        self.url.is_some() && matches!(self.protocol.as_deref(), Some("https" | "http"))
    }

    pub fn is_mp4(&self) -> bool {
        self.ext.as_deref() == Some("mp4")
    }

    /// Exact size when known, otherwise yt-dlp's estimate
    pub fn size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }
}

impl VideoInfo {
    /// Formats that carry an audio track
    pub fn audio_formats(&self) -> impl Iterator<Item = &VideoFormat> {
        self.formats.iter().filter(|f| f.has_audio())
    }
}

/// Capabilities required from a video hosting platform
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Resolve a video id into its metadata and format list
    async fn get_video(&self, video_id: &str) -> Result<VideoInfo, PlatformError>;

    /// Open a byte stream for one of the video's formats
    async fn open_stream(
        &self,
        video: &VideoInfo,
        format: &VideoFormat,
    ) -> Result<VideoStream, PlatformError>;
}

/// [VideoPlatform] backed by `yt-dlp` for metadata and reqwest for the bytes
pub struct YtDlpClient {
    program: String,
    client: Client,
}

impl YtDlpClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            client: Client::new(),
        }
    }

    fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
}

#[async_trait]
impl VideoPlatform for YtDlpClient {
    async fn get_video(&self, video_id: &str) -> Result<VideoInfo, PlatformError> {
        debug!(program = %self.program, video_id = %video_id, "Resolving video metadata");

        let output = Command::new(&self.program)
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-progress")
            .arg("--")
            .arg(Self::watch_url(video_id))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PlatformError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PlatformError::Lookup {
                video_id: video_id.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| PlatformError::Metadata {
            video_id: video_id.to_string(),
            source,
        })
    }

    async fn open_stream(
        &self,
        video: &VideoInfo,
        format: &VideoFormat,
    ) -> Result<VideoStream, PlatformError> {
        let url = format
            .url
            .as_deref()
            .ok_or_else(|| PlatformError::NoStreamUrl {
                format_id: format.format_id.clone(),
            })?;

        debug!(video_id = %video.id, format_id = %format.format_id, "Opening video stream");

        let mut request = self.client.get(url);
        for (name, value) in &format.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Request(e.without_url()))?;
        if !response.status().is_success() {
            return Err(PlatformError::Status(response.status()));
        }

        let bytes = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "id": "abc123",
        "title": "Dune: Part Two | Official Trailer",
        "formats": [
            {"format_id": "139", "ext": "m4a", "acodec": "mp4a.40.5", "vcodec": "none", "filesize": 800000, "protocol": "https", "url": "https://example.invalid/139"},
            {"format_id": "160", "ext": "mp4", "acodec": "none", "vcodec": "avc1.4d400c", "filesize": 1200000, "protocol": "https", "url": "https://example.invalid/160"},
            {"format_id": "18", "ext": "mp4", "acodec": "mp4a.40.2", "vcodec": "avc1.42001E", "filesize_approx": 9000000, "protocol": "https", "url": "https://example.invalid/18",
             "http_headers": {"User-Agent": "Mozilla/5.0"}},
            {"format_id": "93", "ext": "mp4", "acodec": "mp4a.40.2", "vcodec": "avc1.4D401E", "filesize_approx": 20000000, "protocol": "m3u8_native",
             "url": "https://manifest.example.invalid/hls_playlist/itag/93/index.m3u8"},
            {"format_id": "sb0", "ext": "mhtml"}
        ]
    }"#;

    #[test]
    fn test_decode_ytdlp_metadata() {
        let info: VideoInfo = serde_json::from_str(METADATA).unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.title.as_deref(), Some("Dune: Part Two | Official Trailer"));
        assert_eq!(info.formats.len(), 5);

        let audio: Vec<&str> = info.audio_formats().map(|f| f.format_id.as_str()).collect();
        assert_eq!(audio, vec!["139", "18", "93"]);

        let muxed = &info.formats[2];
        assert!(muxed.has_audio() && muxed.has_video());
        assert!(muxed.is_direct() && muxed.is_mp4());
        assert_eq!(muxed.size(), Some(9_000_000));
        assert_eq!(muxed.http_headers.get("User-Agent").map(String::as_str), Some("Mozilla/5.0"));

        let hls = &info.formats[3];
        assert!(hls.has_audio() && !hls.is_direct());

        let storyboard = &info.formats[4];
        assert!(!storyboard.has_audio() && !storyboard.has_video() && !storyboard.is_direct());
        assert_eq!(storyboard.size(), None);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let client = YtDlpClient::new("/nonexistent/yt-dlp-for-tests");
        let result = client.get_video("abc123").await;
        assert!(matches!(result, Err(PlatformError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_format_without_url() {
        let client = YtDlpClient::new("yt-dlp");
        let info: VideoInfo = serde_json::from_str(METADATA).unwrap();
        let result = client.open_stream(&info, &info.formats[4]).await;
        assert!(matches!(result, Err(PlatformError::NoStreamUrl { .. })));
    }
}
