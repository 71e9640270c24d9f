//! Harvest module - the resilient related-video collection loop.
//!
//! This module provides the core of the harvester:
//! - **Traits**: [`SearchClient`], [`ClientFactory`], [`Sleeper`], [`Clock`]
//! - **Credentials**: forward-only rotation via [`CredentialPool`]
//! - **Classification**: failure categories and actions via [`classify()`]
//! - **Window**: backfill publish-date cutoff via [`WindowFilter`]
//! - **Emitter**: ranked newline-delimited output via [`RecordEmitter`]
//! - **Pipeline**: the per-seed state machine via [`HarvestLoop`]

pub mod classify;
pub mod client;
pub mod credentials;
pub mod emitter;
pub mod pipeline;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;
pub mod window;

// Re-export commonly used types
pub use classify::{classify, Action, FailureClass};
pub use client::{ResultShape, YoutubeClient, YoutubeClientFactory};
pub use credentials::{CredentialPool, Exhausted};
pub use emitter::RecordEmitter;
pub use pipeline::{HarvestLoop, HarvestPlan, HarvestStats, RetryPolicy, RunState};
pub use traits::{
    ApiFailure, ClientFactory, Clock, HarvestError, SearchClient, Sleeper, SystemClock,
    TokioSleeper,
};
pub use window::WindowFilter;
