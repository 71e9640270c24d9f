//! Trending seed selection: the query handed to the query service and a
//! seed source that reads its exported result.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::model::{HarvestMode, Seed};
use crate::traits::{SeedSource, SeedSourceError};

/// The trending-video query for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendingQuery {
    pub mode: HarvestMode,
    pub limit: usize,
}

impl TrendingQuery {
    pub fn new(mode: HarvestMode, limit: usize) -> Self {
        Self { mode, limit }
    }

    /// Inclusive mention-date range for backfill runs: the `lookback_days`
    /// days immediately before the cutoff.
    pub fn mention_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.mode {
            HarvestMode::Live => None,
            HarvestMode::Backfill {
                cutoff,
                lookback_days,
            } => Some((
                cutoff - Duration::days(i64::from(lookback_days)),
                cutoff - Duration::days(1),
            )),
        }
    }

    /// Renders the query text. Mentions are distinct users linking the video.
    pub fn to_sql(&self) -> String {
        let date_filter = match self.mention_window() {
            None => "twitter.creation_date = cast(current_date - interval '1' day as varchar)"
                .to_string(),
            Some((first, last)) => format!(
                "twitter.creation_date between '{}' and '{}'",
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            ),
        };

        format!(
            "select
  youtube.id as id,
  count(distinct twitter.user.id) as mentions
from
  twitter_stream as twitter,
  unnest(twitter.entities.urls) t(tweet_url),
  validated_url,
  youtube_video_snippet as youtube
where
  {date_filter} and
  validated_url.url = tweet_url.expanded_url and
  url_extract_host(validated_url.validated_url) = 'www.youtube.com' and
  url_extract_parameter(validated_url.validated_url, 'v') = youtube.id
group by
  youtube.id
order by
  mentions desc,
  id asc
limit {limit}",
            date_filter = date_filter,
            limit = self.limit
        )
    }
}

/// Seed source backed by a newline-delimited JSON export of the trending
/// query, one `{"id": ..., "mentions": ...}` object per line.
#[derive(Debug, Clone)]
pub struct JsonlSeedSource {
    path: PathBuf,
}

impl JsonlSeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SeedSource for JsonlSeedSource {
    async fn trending_seeds(&self, query: &TrendingQuery) -> Result<Vec<Seed>, SeedSourceError> {
        debug!(sql = %query.to_sql(), "Trending query");
        let content = tokio::fs::read_to_string(&self.path).await?;

        let mut seeds = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if seeds.len() >= query.limit {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let seed: Seed =
                serde_json::from_str(line).map_err(|e| SeedSourceError::InvalidSeed {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            seeds.push(seed);
        }

        info!(path = %self.path.display(), seeds = seeds.len(), "Loaded trending seeds");
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn backfill() -> HarvestMode {
        HarvestMode::Backfill {
            cutoff: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            lookback_days: 2,
        }
    }

    #[test]
    fn test_live_query() {
        let sql = TrendingQuery::new(HarvestMode::Live, 50).to_sql();
        assert!(sql.contains("current_date - interval '1' day"));
        assert!(sql.contains("mentions desc,\n  id asc"));
        assert!(sql.ends_with("limit 50"));
    }

    #[test]
    fn test_backfill_query_window() {
        let query = TrendingQuery::new(backfill(), 50);
        assert_eq!(
            query.mention_window(),
            Some((
                NaiveDate::from_ymd_opt(2023, 4, 29).unwrap(),
                NaiveDate::from_ymd_opt(2023, 4, 30).unwrap()
            ))
        );
        assert!(query
            .to_sql()
            .contains("twitter.creation_date between '2023-04-29' and '2023-04-30'"));
    }

    #[tokio::test]
    async fn test_jsonl_source_reads_in_order_up_to_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id":"A","mentions":5}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"id":"B","mentions":3}}"#).unwrap();
        writeln!(file, r#"{{"id":"C","mentions":1}}"#).unwrap();

        let source = JsonlSeedSource::new(file.path());
        let seeds = source
            .trending_seeds(&TrendingQuery::new(HarvestMode::Live, 2))
            .await
            .unwrap();

        assert_eq!(
            seeds,
            vec![
                Seed {
                    id: "A".to_string(),
                    mentions: 5
                },
                Seed {
                    id: "B".to_string(),
                    mentions: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_jsonl_source_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id":"A","mentions":5}}"#).unwrap();
        writeln!(file, r#"{{"id":"B"}}"#).unwrap();

        let err = JsonlSeedSource::new(file.path())
            .trending_seeds(&TrendingQuery::new(HarvestMode::Live, 50))
            .await
            .unwrap_err();
        assert!(matches!(err, SeedSourceError::InvalidSeed { line: 2, .. }));
    }
}
