use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::harvest::pipeline::{HarvestPlan, RetryPolicy};
use crate::model::Credential;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Run configuration, read from a JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Ordered API keys; rotation walks them front to back
    pub youtube: Vec<Credential>,
    pub parameter: Parameters,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    pub region_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub related_count: u32,
    pub backfill_multiplier: u32,
    pub max_page_size: u32,
    pub backfill_cap: u32,
    pub unavailable_retry_limit: u32,
    pub reset_retry_limit: u32,
    pub unavailable_backoff_secs: u64,
    pub reset_backoff_secs: u64,
    pub trending_count: usize,
    pub lookback_days: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            related_count: 10,
            backfill_multiplier: 3,
            max_page_size: 50,
            backfill_cap: 10,
            unavailable_retry_limit: 10,
            reset_retry_limit: 10,
            unavailable_backoff_secs: 30,
            reset_backoff_secs: 60,
            trending_count: 50,
            lookback_days: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub staging_dir: PathBuf,
    pub publish_dir: PathBuf,
    /// Where registration statements are appended
    pub schema_log: Option<PathBuf>,
    /// Table location used in the DDL; defaults to the publish directory
    pub table_location: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("tmp"),
            publish_dir: PathBuf::from("published"),
            schema_log: None,
            table_location: None,
        }
    }
}

impl StorageConfig {
    pub fn schema_log(&self) -> PathBuf {
        self.schema_log
            .clone()
            .unwrap_or_else(|| self.publish_dir.join("schema.sql"))
    }

    pub fn table_location(&self) -> String {
        self.table_location
            .clone()
            .unwrap_or_else(|| format!("file://{}", self.publish_dir.display()))
    }
}

impl HarvestConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.youtube.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one youtube developer_key is required".to_string(),
            ));
        }
        if self.parameter.region_code.trim().is_empty() {
            return Err(ConfigError::Invalid("region_code must not be empty".to_string()));
        }
        let limits = &self.limits;
        for (name, value) in [
            ("related_count", limits.related_count),
            ("backfill_multiplier", limits.backfill_multiplier),
            ("max_page_size", limits.max_page_size),
            ("backfill_cap", limits.backfill_cap),
            ("lookback_days", limits.lookback_days),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if limits.trending_count == 0 {
            return Err(ConfigError::Invalid("trending_count must be positive".to_string()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            unavailable_limit: self.limits.unavailable_retry_limit,
            reset_limit: self.limits.reset_retry_limit,
            unavailable_backoff: Duration::from_secs(self.limits.unavailable_backoff_secs),
            reset_backoff: Duration::from_secs(self.limits.reset_backoff_secs),
        }
    }

    /// Harvest plan for live mode or, given a cutoff, backfill mode.
    pub fn plan(&self, cutoff: Option<chrono::NaiveDate>) -> HarvestPlan {
        match cutoff {
            None => HarvestPlan::live(self.limits.related_count),
            Some(cutoff) => HarvestPlan::backfill(
                cutoff,
                self.limits.lookback_days,
                self.limits.backfill_cap,
                self.limits.backfill_multiplier,
                self.limits.max_page_size,
            ),
        }
    }

    /// Logs the configuration without any key material.
    pub fn log_redacted(&self) {
        info!(
            developer_keys = self.youtube.len(),
            region_code = %self.parameter.region_code,
            related_count = self.limits.related_count,
            backfill_cap = self.limits.backfill_cap,
            trending_count = self.limits.trending_count,
            lookback_days = self.limits.lookback_days,
            staging_dir = %self.storage.staging_dir.display(),
            publish_dir = %self.storage.publish_dir.display(),
            "Configuration loaded"
        );
    }
}
