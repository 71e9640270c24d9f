//! Ranking, provenance stamping and newline-delimited serialization of
//! accepted results.

use std::io::Write;
use std::sync::Arc;

use crate::harvest::traits::{Clock, HarvestError};
use crate::harvest::window::parse_published_at;
use crate::model::{RelatedRecord, SearchItem, Seed};

/// Writes one JSON line per accepted result, flushing after every record so
/// that a run aborted later leaves all earlier records on disk.
pub struct RecordEmitter<W: Write> {
    writer: W,
    clock: Arc<dyn Clock>,
    emitted: usize,
}

impl<W: Write> RecordEmitter<W> {
    pub fn new(writer: W, clock: Arc<dyn Clock>) -> Self {
        Self {
            writer,
            clock,
            emitted: 0,
        }
    }

    /// Emits `accepted` for `seed` in the given order with ranks `1..=n`.
    ///
    /// Returns the number of records written.
    pub fn emit(&mut self, seed: &Seed, accepted: Vec<SearchItem>) -> Result<usize, HarvestError> {
        let mut written = 0;
        for item in accepted {
            written += 1;
            let record = self.finalize(seed, item, written as u32);
            serde_json::to_writer(&mut self.writer, &record)?;
            self.writer.write_all(b"\n")?;
            self.writer.flush()?;
        }
        self.emitted += written;
        Ok(written)
    }

    /// Total records written so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn finalize(&self, seed: &Seed, item: SearchItem, rank: u32) -> RelatedRecord {
        let snippet = item.snippet.map(|mut snippet| {
            snippet.published_at = snippet.published_at.as_deref().map(normalize_timestamp);
            snippet
        });

        RelatedRecord {
            kind: item.kind,
            etag: item.etag,
            id: item.id,
            related_to_video_id: seed.id.clone(),
            retrieved_at: self
                .clock
                .now()
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            rank,
            snippet,
        }
    }
}

/// Rewrites a timestamp as `YYYY-MM-DD HH:MM:SS[.fff]` in UTC, without a
/// zone suffix. Unparseable input gets the `T`/`Z` stripped textually.
pub fn normalize_timestamp(raw: &str) -> String {
    match parse_published_at(raw) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        None => raw.replacen('T', " ", 1).trim_end_matches('Z').to_string(),
    }
}
