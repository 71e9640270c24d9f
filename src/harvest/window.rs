//! Publish-date window for backfill runs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::model::SearchItem;

/// Accepts candidates published no later than midnight (UTC) of the cutoff
/// date, in the order the API returned them, up to `cap` items.
#[derive(Debug, Clone, Copy)]
pub struct WindowFilter {
    cutoff: NaiveDateTime,
    cap: usize,
}

impl WindowFilter {
    pub fn new(cutoff: NaiveDate, cap: usize) -> Self {
        Self {
            cutoff: cutoff.and_time(NaiveTime::MIN),
            cap,
        }
    }

    pub fn cutoff(&self) -> NaiveDateTime {
        self.cutoff
    }

    /// Whether `item` was published inside the window. Items without a
    /// readable `publishedAt` cannot be placed and are rejected.
    pub fn admits(&self, item: &SearchItem) -> bool {
        item.snippet
            .as_ref()
            .and_then(|s| s.published_at.as_deref())
            .and_then(parse_published_at)
            .is_some_and(|published| published <= self.cutoff)
    }

    /// Filters one seed's candidates. Rejected items do not count toward the
    /// cap; scanning stops as soon as the cap is reached.
    pub fn apply(&self, candidates: Vec<SearchItem>) -> Vec<SearchItem> {
        let offered = candidates.len();
        let mut accepted = Vec::with_capacity(self.cap.min(offered));
        for item in candidates {
            if accepted.len() >= self.cap {
                break;
            }
            if self.admits(&item) {
                accepted.push(item);
            }
        }
        debug!(offered, accepted = accepted.len(), cutoff = %self.cutoff, "Window applied");
        accepted
    }
}

/// Parses the timestamp shapes the API and older exports use: RFC 3339 with
/// a zone, naive `T`- or space-separated, or a bare date (midnight).
pub fn parse_published_at(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}
