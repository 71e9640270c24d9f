use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A trending video for which related videos are harvested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub id: String,
    pub mentions: i64,
}

/// Opaque API key. `Debug` never prints the key itself.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    #[serde(rename = "developer_key")]
    key: String,
}

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn expose(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// How a run collects related videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestMode {
    /// Whatever the API suggests right now, partitioned under today's date.
    Live,
    /// Historical snapshot: candidates published after `cutoff` are dropped.
    Backfill { cutoff: NaiveDate, lookback_days: u32 },
}

impl HarvestMode {
    pub fn is_backfill(&self) -> bool {
        matches!(self, HarvestMode::Backfill { .. })
    }
}

// ============================================================================
// search.list wire shapes
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One suggestion as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub etag: String,
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemId {
    #[serde(rename = "videoId", default)]
    pub video_id: String,
    #[serde(default)]
    pub kind: String,
}

/// Snippet of a suggested video. Only the fields the harvester reads are
/// typed; everything else the API sends is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(rename = "publishedAt", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    #[serde(rename = "channelId", default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "channelTitle", default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

// ============================================================================
// Output record
// ============================================================================

/// One accepted related video, as written to the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedRecord {
    pub kind: String,
    pub etag: String,
    pub id: ItemId,

    #[serde(rename = "relatedToVideoId")]
    pub related_to_video_id: String,

    /// UTC, `YYYY-MM-DD HH:MM:SS.mmm`
    pub retrieved_at: String,

    /// 1-based, contiguous per seed
    pub rank: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<Snippet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("AIza-secret");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(credential.expose(), "AIza-secret");
    }

    #[test]
    fn test_search_response_tolerates_missing_items() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"kind":"youtube#searchListResponse"}"#).unwrap();
        assert!(response.items.is_empty());
    }

    #[test]
    fn test_snippet_keeps_unknown_fields() {
        let raw = r#"{
            "kind": "youtube#searchResult",
            "etag": "e1",
            "id": {"kind": "youtube#video", "videoId": "v1"},
            "snippet": {
                "publishedAt": "2023-04-28T10:00:00Z",
                "channelId": "c1",
                "title": "t",
                "channelTitle": "ct",
                "liveBroadcastContent": "none"
            }
        }"#;
        let item: SearchItem = serde_json::from_str(raw).unwrap();
        let snippet = item.snippet.as_ref().unwrap();
        assert_eq!(snippet.published_at.as_deref(), Some("2023-04-28T10:00:00Z"));
        assert_eq!(
            snippet.extra.get("liveBroadcastContent"),
            Some(&serde_json::Value::String("none".into()))
        );

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["snippet"]["liveBroadcastContent"], "none");
        assert_eq!(back["id"]["videoId"], "v1");
    }
}
