//! Staging, compression and publishing of the harvest output.
//!
//! Records are appended to an uncompressed staging file while the loop runs.
//! After a successful loop the file is gzip-compressed and published under
//! `youtube_related_video/creation_date=<date>/<records>.json.gz`. A run that
//! aborts leaves the staging file untouched.

use async_trait::async_trait;
use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::traits::{ObjectStore, StorageError};

/// Table and key prefix of the dataset.
pub const DATASET: &str = "youtube_related_video";

/// Extension of published objects.
pub const OBJECT_EXTENSION: &str = "json.gz";

/// Object key for a file of `records` records in the `partition` partition.
pub fn object_key(partition: NaiveDate, records: usize) -> String {
    format!(
        "{}/creation_date={}/{}.{}",
        DATASET,
        partition.format("%Y-%m-%d"),
        records,
        OBJECT_EXTENSION
    )
}

/// Uncompressed newline-delimited output of one run.
#[derive(Debug, Clone)]
pub struct StagingFile {
    pub path: PathBuf,
}

impl StagingFile {
    /// Creates (truncating) `<dir>/youtube_related_video.json`.
    pub fn create(dir: &Path) -> io::Result<(Self, BufWriter<File>)> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", DATASET));
        let file = File::create(&path)?;
        Ok((Self { path }, BufWriter::new(file)))
    }

    /// Gzip-compresses the staging file next to itself and removes the
    /// original. Returns the compressed file's path.
    pub fn compress(self) -> io::Result<PathBuf> {
        let mut target = self.path.clone().into_os_string();
        target.push(".gz");
        let target = PathBuf::from(target);

        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut encoder = GzEncoder::new(BufWriter::new(File::create(&target)?), Compression::best());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        std::fs::remove_file(&self.path)?;
        info!(from = %self.path.display(), to = %target.display(), "Compressed staging file");
        Ok(target)
    }
}

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `key` under the root, rejecting keys that would escape it.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(StorageError::InvalidKey(key.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn publish(&self, local: &Path, key: &str) -> Result<(), StorageError> {
        let target = self.resolve(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, &target).await?;
        info!(file = %local.display(), key, root = %self.root.display(), "Published object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::{Read, Write};

    #[test]
    fn test_object_key_layout() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert_eq!(
            object_key(date, 2),
            "youtube_related_video/creation_date=2023-05-01/2.json.gz"
        );
        assert_eq!(
            object_key(date, 0),
            "youtube_related_video/creation_date=2023-05-01/0.json.gz"
        );
    }

    #[test]
    fn test_compress_replaces_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let (staging, mut writer) = StagingFile::create(dir.path()).unwrap();
        writer.write_all(b"{\"rank\":1}\n{\"rank\":2}\n").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let staged = staging.path.clone();
        let compressed = staging.compress().unwrap();

        assert!(!staged.exists());
        assert_eq!(
            compressed,
            dir.path().join("youtube_related_video.json.gz")
        );
        let mut text = String::new();
        GzDecoder::new(File::open(&compressed).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "{\"rank\":1}\n{\"rank\":2}\n");
    }

    #[test]
    fn test_resolve_rejects_escaping_keys() {
        let store = LocalObjectStore::new("/tmp/store");
        assert!(store.resolve("../../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
        assert_eq!(
            store.resolve("a/b.json.gz").unwrap(),
            PathBuf::from("/tmp/store/a/b.json.gz")
        );
    }

    #[tokio::test]
    async fn test_publish_creates_partition_directories() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out.json.gz");
        std::fs::write(&local, b"payload").unwrap();

        let store = LocalObjectStore::new(dir.path().join("bucket"));
        let key = object_key(NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(), 7);
        store.publish(&local, &key).await.unwrap();

        let published = dir
            .path()
            .join("bucket/youtube_related_video/creation_date=2023-05-01/7.json.gz");
        assert_eq!(std::fs::read(published).unwrap(), b"payload");
    }
}
