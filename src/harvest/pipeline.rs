//! Sequential harvest loop.
//!
//! This module provides the [`HarvestLoop`] that walks the seed list one
//! seed at a time and, for each seed, drives the request state machine:
//!
//! ```text
//! Requesting ──ok──────────────► Success  (window filter, emit, next seed)
//!     │  ▲
//!     │  └── AuthRejected / TransientUnavailable / ConnectionReset  (Retrying)
//!     ├──── ContentGone ───────► Skipped  (zero records, next seed)
//!     └──── Unclassified / pool exhausted / retry limit ──► Aborted (whole run)
//! ```
//!
//! Backoff delays go through an injectable [`Sleeper`]; all mutable run state
//! lives in an explicit [`RunState`] owned by the caller.

use chrono::NaiveDate;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use crate::harvest::classify::{classify, Action, FailureClass};
use crate::harvest::client::ResultShape;
use crate::harvest::credentials::{CredentialPool, Exhausted};
use crate::harvest::emitter::RecordEmitter;
use crate::harvest::traits::{ClientFactory, HarvestError, SearchClient, Sleeper};
use crate::harvest::window::WindowFilter;
use crate::model::{HarvestMode, SearchItem, Seed};

// ============================================================================
// Loop Configuration
// ============================================================================

/// Retry budgets and backoff delays for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed per seed for `503 Service Unavailable`
    pub unavailable_limit: u32,
    /// Retries allowed per seed for connection resets
    pub reset_limit: u32,
    pub unavailable_backoff: Duration,
    pub reset_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            unavailable_limit: 10,
            reset_limit: 10,
            unavailable_backoff: Duration::from_secs(30),
            reset_backoff: Duration::from_secs(60),
        }
    }
}

/// What a run asks the API for and how much of it it keeps per seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestPlan {
    pub mode: HarvestMode,
    pub shape: ResultShape,
    /// Maximum accepted records per seed
    pub cap: usize,
}

impl HarvestPlan {
    pub fn live(related_count: u32) -> Self {
        Self {
            mode: HarvestMode::Live,
            shape: ResultShape::live(related_count),
            cap: related_count as usize,
        }
    }

    pub fn backfill(
        cutoff: NaiveDate,
        lookback_days: u32,
        cap: u32,
        multiplier: u32,
        max_page_size: u32,
    ) -> Self {
        Self {
            mode: HarvestMode::Backfill {
                cutoff,
                lookback_days,
            },
            shape: ResultShape::backfill(cap, multiplier, max_page_size),
            cap: cap as usize,
        }
    }

    /// Narrows one seed's API batch to the records that will be emitted.
    pub fn accept(&self, mut items: Vec<SearchItem>) -> Vec<SearchItem> {
        match self.mode {
            HarvestMode::Live => {
                items.truncate(self.cap);
                items
            }
            HarvestMode::Backfill { cutoff, .. } => WindowFilter::new(cutoff, self.cap).apply(items),
        }
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Per-seed retry counters. Reset whenever a new seed starts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounters {
    pub unavailable: u32,
    pub reset: u32,
}

/// Statistics about one harvest run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    /// Seeds that returned a batch (possibly empty)
    pub seeds_harvested: usize,

    /// Seeds whose content was gone
    pub seeds_skipped: usize,

    /// Records emitted across all seeds
    pub records: usize,

    /// Credential rotations performed
    pub credential_rotations: usize,

    /// Backoff sleeps performed, all seeds
    pub backoffs: usize,

    /// Wall time of the loop (milliseconds)
    pub total_duration_ms: u64,
}

/// Mutable state of a single run.
#[derive(Debug)]
pub struct RunState {
    pub pool: CredentialPool,
    pub counters: RetryCounters,
    pub stats: HarvestStats,
}

impl RunState {
    pub fn new(pool: CredentialPool) -> Self {
        Self {
            pool,
            counters: RetryCounters::default(),
            stats: HarvestStats::default(),
        }
    }
}

/// Result of requesting one seed.
#[derive(Debug)]
pub enum SeedOutcome {
    Success(Vec<SearchItem>),
    Skipped,
}

// ============================================================================
// Harvest Loop
// ============================================================================

/// Sequential, resilient related-video harvest.
///
/// # Example
///
/// ```ignore
/// let harvest = HarvestLoop::new(YoutubeClientFactory::default(), TokioSleeper, "US")
///     .with_plan(HarvestPlan::live(10));
/// let mut state = RunState::new(CredentialPool::new(keys)?);
/// let stats = harvest.run(&seeds, &mut state, &mut emitter).await?;
/// ```
pub struct HarvestLoop<F, S>
where
    F: ClientFactory,
    S: Sleeper,
{
    factory: F,
    sleeper: S,
    region_code: String,
    plan: HarvestPlan,
    policy: RetryPolicy,
}

impl<F, S> HarvestLoop<F, S>
where
    F: ClientFactory,
    S: Sleeper,
{
    /// Creates a live-mode loop with the default retry policy.
    pub fn new(factory: F, sleeper: S, region_code: impl Into<String>) -> Self {
        Self {
            factory,
            sleeper,
            region_code: region_code.into(),
            plan: HarvestPlan::live(10),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_plan(mut self, plan: HarvestPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn plan(&self) -> &HarvestPlan {
        &self.plan
    }

    /// Harvests every seed in order, emitting accepted records as it goes.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] when the run must be aborted: the credential
    /// pool ran out, a transient failure exceeded its retry budget, a failure
    /// could not be classified, or writing a record failed. Records emitted
    /// for earlier seeds are left in place.
    #[instrument(skip_all, fields(seeds = seeds.len(), backfill = self.plan.mode.is_backfill()))]
    pub async fn run<W: Write>(
        &self,
        seeds: &[Seed],
        state: &mut RunState,
        emitter: &mut RecordEmitter<W>,
    ) -> Result<HarvestStats, HarvestError> {
        let start = Instant::now();
        let mut client = self
            .factory
            .connect(state.pool.current())
            .map_err(HarvestError::Connect)?;

        for seed in seeds {
            state.counters = RetryCounters::default();

            match self.request_seed(&mut client, state, seed).await? {
                SeedOutcome::Success(items) => {
                    let offered = items.len();
                    let accepted = self.plan.accept(items);
                    let written = emitter.emit(seed, accepted)?;
                    state.stats.seeds_harvested += 1;
                    state.stats.records += written;
                    info!(seed = %seed.id, mentions = seed.mentions, offered, records = written, "Seed harvested");
                }
                SeedOutcome::Skipped => {
                    state.stats.seeds_skipped += 1;
                }
            }
        }

        state.stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            records = state.stats.records,
            harvested = state.stats.seeds_harvested,
            skipped = state.stats.seeds_skipped,
            rotations = state.stats.credential_rotations,
            duration_ms = state.stats.total_duration_ms,
            "Harvest loop completed"
        );
        Ok(state.stats.clone())
    }

    /// Requests one seed until it succeeds, is skipped, or the run aborts.
    async fn request_seed(
        &self,
        client: &mut F::Client,
        state: &mut RunState,
        seed: &Seed,
    ) -> Result<SeedOutcome, HarvestError> {
        loop {
            let failure = match client
                .fetch_related(seed, &self.region_code, self.plan.shape)
                .await
            {
                Ok(response) => return Ok(SeedOutcome::Success(response.items)),
                Err(failure) => failure,
            };

            let class = classify(&failure);
            match class.action() {
                Action::RotateCredential => {
                    let attempted = state.pool.len();
                    info!(seed = %seed.id, key_index = state.pool.index(), error = %failure, "Invalid developer key, rotating");
                    match state.pool.advance() {
                        Ok(next) => {
                            *client = self.factory.connect(next).map_err(HarvestError::Connect)?;
                            state.stats.credential_rotations += 1;
                        }
                        Err(Exhausted) => {
                            error!(seed = %seed.id, attempted, "Credential pool exhausted");
                            return Err(HarvestError::PoolExhausted {
                                seed: seed.id.clone(),
                                attempted,
                            });
                        }
                    }
                }
                Action::Backoff { reconnect } => {
                    let (count, limit, delay) = match class {
                        FailureClass::ConnectionReset => {
                            state.counters.reset += 1;
                            (state.counters.reset, self.policy.reset_limit, self.policy.reset_backoff)
                        }
                        _ => {
                            state.counters.unavailable += 1;
                            (
                                state.counters.unavailable,
                                self.policy.unavailable_limit,
                                self.policy.unavailable_backoff,
                            )
                        }
                    };

                    if count > limit {
                        error!(seed = %seed.id, ?class, retries = limit, "Retry limit exceeded");
                        return Err(HarvestError::RetriesExhausted {
                            seed: seed.id.clone(),
                            class,
                            retries: limit,
                            last: failure,
                        });
                    }

                    warn!(
                        seed = %seed.id,
                        ?class,
                        attempt = count,
                        limit,
                        delay_secs = delay.as_secs(),
                        "Transient failure, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                    state.stats.backoffs += 1;

                    if reconnect {
                        *client = self
                            .factory
                            .connect(state.pool.current())
                            .map_err(HarvestError::Connect)?;
                    }
                }
                Action::Skip => {
                    info!(seed = %seed.id, error = %failure, "Seed content unavailable, skipping");
                    return Ok(SeedOutcome::Skipped);
                }
                Action::Abort => {
                    error!(seed = %seed.id, error = %failure, "Unclassified failure");
                    return Err(HarvestError::Unclassified {
                        seed: seed.id.clone(),
                        source: failure,
                    });
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
