use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::harvest::{
    ClientFactory, Clock, CredentialPool, HarvestError, HarvestLoop, HarvestStats, RecordEmitter,
    RunState, Sleeper, SystemClock,
};
use crate::model::{Credential, HarvestMode};
use crate::schema::register_dataset;
use crate::storage::{object_key, StagingFile};
use crate::traits::{
    ObjectStore, SchemaError, SchemaRegistry, SeedSource, SeedSourceError, StorageError,
};
use crate::trending::TrendingQuery;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Seed selection failed: {0}")]
    Seeds(#[from] SeedSourceError),
    #[error("Harvest aborted: {0}")]
    Harvest(#[from] HarvestError),
    #[error("Publishing failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Schema registration failed: {0}")]
    Schema(#[from] SchemaError),
    #[error("Staging I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Compression task failed: {0}")]
    Join(String),
}

/// What a completed run published.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub partition: NaiveDate,
    pub key: String,
    pub records: usize,
    pub stats: HarvestStats,
}

/// Runs one complete harvest: seeds in, compressed partition file out.
pub struct HarvestExecutor<F, S>
where
    F: ClientFactory,
    S: Sleeper,
{
    harvest: HarvestLoop<F, S>,
    credentials: Vec<Credential>,
    trending_count: usize,
    staging_dir: PathBuf,
    table_location: String,
    clock: Arc<dyn Clock>,
}

impl<F, S> HarvestExecutor<F, S>
where
    F: ClientFactory,
    S: Sleeper,
{
    pub fn new(
        harvest: HarvestLoop<F, S>,
        credentials: Vec<Credential>,
        staging_dir: impl Into<PathBuf>,
        table_location: impl Into<String>,
    ) -> Self {
        Self {
            harvest,
            credentials,
            trending_count: 50,
            staging_dir: staging_dir.into(),
            table_location: table_location.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_trending_count(mut self, trending_count: usize) -> Self {
        self.trending_count = trending_count;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Selects seeds, harvests them into the staging file, then compresses,
    /// publishes and registers the result.
    ///
    /// If the harvest aborts, the staging file keeps every record written so
    /// far and nothing is published.
    #[instrument(skip_all, fields(backfill = self.harvest.plan().mode.is_backfill()))]
    pub async fn execute(
        &self,
        source: &dyn SeedSource,
        store: &dyn ObjectStore,
        registry: &dyn SchemaRegistry,
    ) -> Result<RunOutcome, RunError> {
        let plan = *self.harvest.plan();
        let query = TrendingQuery::new(plan.mode, self.trending_count);
        let seeds = source.trending_seeds(&query).await?;
        info!(seeds = seeds.len(), "Starting harvest");

        let mut state = RunState::new(CredentialPool::new(self.credentials.clone())?);
        let (staging, writer) = StagingFile::create(&self.staging_dir)?;
        let mut emitter = RecordEmitter::new(writer, self.clock.clone());

        let stats = self.harvest.run(&seeds, &mut state, &mut emitter).await?;
        let records = emitter.emitted();
        emitter.into_inner().flush()?;

        info!(file = %staging.path.display(), "Compressing output");
        let compressed = tokio::task::spawn_blocking(move || staging.compress())
            .await
            .map_err(|e| RunError::Join(e.to_string()))??;

        let partition = match plan.mode {
            HarvestMode::Live => self.clock.now().date_naive(),
            HarvestMode::Backfill { cutoff, .. } => cutoff,
        };
        let key = object_key(partition, records);
        store.publish(&compressed, &key).await?;

        register_dataset(registry, &self.table_location).await?;

        info!(key = %key, records, "Concluded collecting related videos");
        Ok(RunOutcome {
            partition,
            key,
            records,
            stats,
        })
    }
}
