//! Radarr API client for the movie catalog
//!
//! Only the movie list is consumed: `GET {url}/api/v3/movie?apikey={key}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::text_utils::redact_secret;

/// Movie as reported by Radarr. Only the fields needed for trailers are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "youTubeTrailerId", default)]
    pub youtube_trailer_id: String,
    /// Radarr's own "file downloaded" flag
    #[serde(default)]
    pub downloaded: bool,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to catalog failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("catalog answered with status {status}")]
    Status { status: StatusCode, body: String },

    #[error("failed to read catalog response: {0}")]
    Body(#[source] reqwest::Error),

    #[error("failed to decode movie list: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of the per-cycle movie list
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Fetch every movie. Failures are logged and yield an empty list.
    async fn fetch_catalog(&self) -> Vec<Movie>;
}

/// Radarr API client
pub struct RadarrClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl RadarrClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build configured HTTP client, using defaults");
                Client::new()
            });

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    fn movies_url(&self) -> String {
        format!("{}/api/v3/movie?apikey={}", self.base_url, self.api_key)
    }

    /// Fetch the movie list, reporting what went wrong
    pub async fn try_fetch_catalog(&self) -> Result<Vec<Movie>, CatalogError> {
        debug!(url = %self.base_url, "Fetching movie list from Radarr");

        let response = self
            .client
            .get(self.movies_url())
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Body(e.without_url()))?;

        if status != StatusCode::OK {
            return Err(CatalogError::Status { status, body });
        }

        let movies: Vec<Movie> = serde_json::from_str(&body)?;
        debug!(count = movies.len(), "Received movie list from Radarr");
        Ok(movies)
    }
}

#[async_trait]
impl MovieCatalog for RadarrClient {
    async fn fetch_catalog(&self) -> Vec<Movie> {
        match self.try_fetch_catalog().await {
            Ok(movies) => movies,
            Err(CatalogError::Status { status, body }) => {
                warn!(
                    url = %self.base_url,
                    status = status.as_u16(),
                    body = %body,
                    "Did not receive status 200 from Radarr"
                );
                Vec::new()
            }
            Err(e @ (CatalogError::Transport(_) | CatalogError::Body(_))) => {
                warn!(
                    url = %self.base_url,
                    key = %redact_secret(&self.api_key),
                    error = %e,
                    "Failed to get list of movies from Radarr"
                );
                Vec::new()
            }
            Err(e @ CatalogError::Decode(_)) => {
                warn!(error = %e, "Failed to decode list of movies from Radarr");
                Vec::new()
            }
        }
    }
}
