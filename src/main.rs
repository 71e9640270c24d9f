use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use related_harvester::harvest::{HarvestLoop, TokioSleeper, YoutubeClientFactory};
use related_harvester::schema::StatementLogRegistry;
use related_harvester::storage::LocalObjectStore;
use related_harvester::trending::JsonlSeedSource;
use related_harvester::{HarvestConfig, HarvestExecutor};

/// Harvest related-video suggestions for trending videos.
#[derive(Debug, Parser)]
#[command(name = "related-harvester", version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Trending-query export, one {"id", "mentions"} object per line
    #[arg(short, long)]
    seeds: PathBuf,

    /// Backfill the snapshot as of this date (YYYY-MM-DD) instead of collecting live
    #[arg(long, value_parser = parse_date)]
    creation_date: Option<NaiveDate>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("{raw}: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("related_harvester=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = HarvestConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.log_redacted();

    let plan = config.plan(cli.creation_date);
    let harvest = HarvestLoop::new(
        YoutubeClientFactory::default(),
        TokioSleeper,
        config.parameter.region_code.clone(),
    )
    .with_plan(plan)
    .with_policy(config.retry_policy());

    let executor = HarvestExecutor::new(
        harvest,
        config.youtube.clone(),
        config.storage.staging_dir.clone(),
        config.storage.table_location(),
    )
    .with_trending_count(config.limits.trending_count);

    let outcome = executor
        .execute(
            &JsonlSeedSource::new(cli.seeds),
            &LocalObjectStore::new(config.storage.publish_dir.clone()),
            &StatementLogRegistry::new(config.storage.schema_log()),
        )
        .await;

    match outcome {
        Ok(outcome) => {
            info!(
                key = %outcome.key,
                records = outcome.records,
                skipped = outcome.stats.seeds_skipped,
                rotations = outcome.stats.credential_rotations,
                "Run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run aborted");
            Err(e.into())
        }
    }
}
