//! YouTube Data API v3 `search.list` client.

use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;

use crate::harvest::traits::{ApiFailure, ClientFactory, SearchClient};
use crate::model::{Credential, SearchResponse, Seed};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Field richness and page size of one related-video request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Identifiers only.
    Identifiers { max_results: u32 },
    /// Identifiers plus snippets, which carry `publishedAt`.
    Snippets { max_results: u32 },
}

impl ResultShape {
    pub fn live(related_count: u32) -> Self {
        ResultShape::Identifiers {
            max_results: related_count,
        }
    }

    /// Over-fetches `multiplier` times the target so that enough candidates
    /// survive the publish-date cutoff, capped at the API's page size.
    pub fn backfill(target: u32, multiplier: u32, max_page_size: u32) -> Self {
        ResultShape::Snippets {
            max_results: target.saturating_mul(multiplier).min(max_page_size),
        }
    }

    pub fn part(&self) -> &'static str {
        match self {
            ResultShape::Identifiers { .. } => "id",
            ResultShape::Snippets { .. } => "id,snippet",
        }
    }

    pub fn max_results(&self) -> u32 {
        match self {
            ResultShape::Identifiers { max_results } | ResultShape::Snippets { max_results } => {
                *max_results
            }
        }
    }
}

/// A `search.list` connection bound to one API key.
pub struct YoutubeClient {
    client: reqwest::Client,
    key: String,
    base_url: String,
}

#[async_trait]
impl SearchClient for YoutubeClient {
    async fn fetch_related(
        &self,
        seed: &Seed,
        region_code: &str,
        shape: ResultShape,
    ) -> Result<SearchResponse, ApiFailure> {
        let max_results = shape.max_results().to_string();
        debug!(seed = %seed.id, part = shape.part(), max_results = %max_results, "search.list");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("part", shape.part()),
                ("type", "video"),
                ("regionCode", region_code),
                ("relatedToVideoId", seed.id.as_str()),
                ("maxResults", max_results.as_str()),
                ("key", self.key.as_str()),
            ])
            .send()
            .await
            .map_err(transport_failure)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.map_err(transport_failure)?;
            return Err(http_failure(status.as_u16(), &body));
        }

        let body = resp.bytes().await.map_err(transport_failure)?;
        serde_json::from_slice(&body).map_err(|e| ApiFailure::Decode(e.to_string()))
    }
}

/// Builds a [`YoutubeClient`] with a fresh connection pool per call.
#[derive(Debug, Clone)]
pub struct YoutubeClientFactory {
    base_url: String,
    timeout: Duration,
}

impl Default for YoutubeClientFactory {
    fn default() -> Self {
        Self {
            base_url: SEARCH_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl YoutubeClientFactory {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ClientFactory for YoutubeClientFactory {
    type Client = YoutubeClient;

    fn connect(&self, credential: &Credential) -> Result<YoutubeClient, ApiFailure> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(transport_failure)?;
        Ok(YoutubeClient {
            client,
            key: credential.expose().to_string(),
            base_url: self.base_url.clone(),
        })
    }
}

// ============================================================================
// Failure mapping
// ============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: Option<String>,
}

fn http_failure(status: u16, body: &str) -> ApiFailure {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ApiFailure::Http {
            status,
            reason: parsed.error.errors.into_iter().find_map(|e| e.reason),
            message: parsed.error.message,
        },
        Err(_) => ApiFailure::Http {
            status,
            reason: None,
            message: body.to_string(),
        },
    }
}

/// Maps a reqwest error, looking through its source chain for an
/// `ECONNRESET` from the socket.
///
/// The request URL is dropped first: its query string holds the API key.
fn transport_failure(err: reqwest::Error) -> ApiFailure {
    let err = err.without_url();
    let mut chain = vec![err.to_string()];
    let mut reset = false;
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            reset |= io.kind() == std::io::ErrorKind::ConnectionReset;
        }
        chain.push(cause.to_string());
        source = cause.source();
    }

    let text = chain.join(": ");
    if reset {
        ApiFailure::ConnectionReset(text)
    } else {
        ApiFailure::Transport(text)
    }
}
