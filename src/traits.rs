//! Interfaces of the collaborators around the harvest loop: the query
//! service that supplies seeds, the object store that receives the output,
//! and the catalog that makes it queryable.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::model::Seed;
use crate::trending::TrendingQuery;

#[derive(Error, Debug)]
pub enum SeedSourceError {
    #[error("Failed to read seed list: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed seed on line {line}: {message}")]
    InvalidSeed { line: usize, message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema statement failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces the trending seed list.
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Returns the seeds for `query`, in the order the query defines
    /// (mentions descending, then id ascending), at most `query.limit`.
    async fn trending_seeds(&self, query: &TrendingQuery) -> Result<Vec<Seed>, SeedSourceError>;
}

/// Receives the compressed output file.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn publish(&self, local: &Path, key: &str) -> Result<(), StorageError>;
}

/// Executes table-definition statements against the catalog.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn execute(&self, statement: &str) -> Result<(), SchemaError>;
}
