//! Table definition of the published dataset.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::storage::DATASET;
use crate::traits::{SchemaError, SchemaRegistry};

/// `CREATE EXTERNAL TABLE` for the dataset stored under `location`.
///
/// Columns mirror [`crate::model::RelatedRecord`]; `snippet` is only present
/// in backfill partitions and reads as null elsewhere.
pub fn create_table_statement(location: &str) -> String {
    format!(
        "create external table if not exists {table}
(
    kind string,
    etag string,
    id   struct<
        videoId: string,
        kind:    string
    >,
    relatedToVideoId string,
    retrieved_at timestamp,
    rank int,
    snippet struct<
        publishedAt:  timestamp,
        channelId:    string,
        title:        string,
        description:  string,
        channelTitle: string,
        liveBroadcastContent: string
    >
)
PARTITIONED BY (creation_date String)
ROW FORMAT SERDE 'org.openx.data.jsonserde.JsonSerDe'
WITH SERDEPROPERTIES (
    'serialization.format' = '1',
    'ignore.malformed.json' = 'true'
)
LOCATION '{location}/{table}/'
TBLPROPERTIES ('has_encrypted_data'='false')",
        table = DATASET,
        location = location.trim_end_matches('/')
    )
}

/// Statements that (re)declare the table and refresh its partitions.
pub fn registration_statements(location: &str) -> Vec<String> {
    vec![
        format!("DROP TABLE IF EXISTS {}", DATASET),
        create_table_statement(location),
        format!("MSCK REPAIR TABLE {}", DATASET),
    ]
}

/// Runs the registration statements in order.
pub async fn register_dataset<R: SchemaRegistry + ?Sized>(
    registry: &R,
    location: &str,
) -> Result<(), SchemaError> {
    info!(table = DATASET, location, "Recreating table");
    for statement in registration_statements(location) {
        registry.execute(&statement).await?;
    }
    Ok(())
}

/// Registry that appends each statement to a `.sql` log for an operator or
/// a downstream job to replay.
#[derive(Debug, Clone)]
pub struct StatementLogRegistry {
    path: PathBuf,
}

impl StatementLogRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SchemaRegistry for StatementLogRegistry {
    async fn execute(&self, statement: &str) -> Result<(), SchemaError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(statement.as_bytes()).await?;
        file.write_all(b";\n").await?;
        file.flush().await?;
        Ok(())
    }
}
