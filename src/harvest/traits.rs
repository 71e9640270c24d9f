//! Core traits and error types for the harvest loop.
//!
//! The loop talks to the outside world through four seams:
//! - [`SearchClient`] / [`ClientFactory`] for the related-video search call
//! - [`Sleeper`] for backoff delays
//! - [`Clock`] for retrieval timestamps and the live partition date
//!
//! Failures of the search call are reported as [`ApiFailure`] and classified
//! by [`crate::harvest::classify()`]; outcomes that end a run are
//! [`HarvestError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::harvest::classify::FailureClass;
use crate::harvest::client::ResultShape;
use crate::model::{Credential, SearchResponse, Seed};

// ============================================================================
// Search Seam
// ============================================================================

/// A search connection bound to one credential.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Requests the videos the API considers related to `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiFailure`] for any transport or API-level failure. The
    /// caller decides what the failure means.
    async fn fetch_related(
        &self,
        seed: &Seed,
        region_code: &str,
        shape: ResultShape,
    ) -> Result<SearchResponse, ApiFailure>;
}

/// Builds fresh [`SearchClient`]s.
///
/// The loop calls [`ClientFactory::connect`] whenever the active credential
/// changes or the peer reset the connection.
pub trait ClientFactory: Send + Sync {
    type Client: SearchClient;

    fn connect(&self, credential: &Credential) -> Result<Self::Client, ApiFailure>;
}

// ============================================================================
// Time Seams
// ============================================================================

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Raw failure of a search call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiFailure {
    /// The API answered with a non-success status.
    ///
    /// `reason` is the first `error.errors[].reason` of the response body
    /// when the API provided one (e.g. `quotaExceeded`, `backendError`).
    #[error("HTTP {status}{}: {message}", .reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    Http {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    /// The peer closed the TCP connection mid-request.
    #[error("connection reset by peer: {0}")]
    ConnectionReset(String),

    /// Any other transport failure (DNS, TLS, timeout, ...). The text never
    /// carries the request URL.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Outcomes that terminate a harvest run.
///
/// Records already written for earlier seeds stay where they are.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// No credentials were supplied
    #[error("credential pool is empty")]
    EmptyPool,

    /// Every credential was rejected
    #[error("all {attempted} credentials rejected while harvesting seed '{seed}'")]
    PoolExhausted { seed: String, attempted: usize },

    /// A transient failure kept recurring past its retry limit
    #[error("{class:?} persisted for seed '{seed}' after {retries} retries: {last}")]
    RetriesExhausted {
        seed: String,
        class: FailureClass,
        retries: u32,
        last: ApiFailure,
    },

    /// A search client could not be built
    #[error("failed to build search client: {0}")]
    Connect(#[source] ApiFailure),

    /// A failure the classifier cannot place
    #[error("unclassified failure for seed '{seed}': {source}")]
    Unclassified {
        seed: String,
        #[source]
        source: ApiFailure,
    },

    /// Writing a record failed
    #[error("I/O error while emitting records: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a record failed
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// Tests
// ============================================================================
