//! Core data models used throughout the discovery pipeline.
//!
//! These types represent the content items, queries, and results that flow
//! from source adapters through the aggregator and ranking engine. All of
//! them serialize with camelCase field names, ISO-8601 timestamps, and
//! lowercase platform names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorDetail, QueryError};

/// Upstream provider an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Twitch,
    Vimeo,
    Dailymotion,
    Rumble,
    Kick,
    Catalog,
}

impl Platform {
    pub const ALL: [Platform; 7] = [
        Platform::Youtube,
        Platform::Twitch,
        Platform::Vimeo,
        Platform::Dailymotion,
        Platform::Rumble,
        Platform::Kick,
        Platform::Catalog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Twitch => "twitch",
            Platform::Vimeo => "vimeo",
            Platform::Dailymotion => "dailymotion",
            Platform::Rumble => "rumble",
            Platform::Kick => "kick",
            Platform::Catalog => "catalog",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Twitch => "Twitch",
            Platform::Vimeo => "Vimeo",
            Platform::Dailymotion => "Dailymotion",
            Platform::Rumble => "Rumble",
            Platform::Kick => "Kick",
            Platform::Catalog => "Local Catalog",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| format!("unknown platform: {}", s))
    }
}

/// Channel or account that published an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub follower_count: u64,
}

/// Per-request ranking signals. Recomputed for every search and never
/// trusted from upstream payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub relevance: f64,
    pub engagement: f64,
    pub freshness: f64,
    pub quality: f64,
    pub personalized: f64,
    pub ai_score: f64,
}

/// A normalized piece of discoverable content from any source.
///
/// `(platform, id)` is the identity used for deduplication. `topics` is
/// ordered: the first entry is the item's dominant topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub platform: Platform,
    #[serde(default)]
    pub platform_display_name: String,

    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub saves: u64,

    /// 0 means live or unknown.
    #[serde(default)]
    pub duration_seconds: u64,
    pub upload_date: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_live: bool,

    #[serde(default)]
    pub fact_checked: bool,
    #[serde(default)]
    pub has_subtitles: bool,
    #[serde(default = "default_content_rating")]
    pub content_rating: String,
    #[serde(default)]
    pub moderation_flags: BTreeSet<String>,

    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub scores: Scores,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_content_rating() -> String {
    "general".to_string()
}

impl ContentItem {
    /// Minimal item with empty metrics; adapters and tests fill in the rest.
    pub fn new(platform: Platform, id: impl Into<String>, title: impl Into<String>, upload_date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            platform,
            platform_display_name: platform.display_name().to_string(),
            title: title.into(),
            description: String::new(),
            category: String::new(),
            tags: BTreeSet::new(),
            topics: Vec::new(),
            keywords: BTreeSet::new(),
            language: default_language(),
            views: 0,
            likes: 0,
            comments: 0,
            shares: 0,
            saves: 0,
            duration_seconds: 0,
            upload_date,
            published_at: None,
            last_updated: None,
            is_live: false,
            fact_checked: false,
            has_subtitles: false,
            content_rating: default_content_rating(),
            moderation_flags: BTreeSet::new(),
            author: Author::default(),
            thumbnail_url: None,
            url: None,
            scores: Scores::default(),
        }
    }

    /// Deduplication key.
    pub fn key(&self) -> (Platform, &str) {
        (self.platform, self.id.as_str())
    }

    pub fn dominant_topic(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }
}

/// Result ordering requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    Date,
    Views,
    Engagement,
    Trending,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::Date => "date",
            SortBy::Views => "views",
            SortBy::Engagement => "engagement",
            SortBy::Trending => "trending",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "date" => Ok(SortBy::Date),
            "views" => Ok(SortBy::Views),
            "engagement" => Ok(SortBy::Engagement),
            "trending" => Ok(SortBy::Trending),
            other => Err(format!(
                "unknown sort: {}. Use relevance, date, views, engagement, or trending.",
                other
            )),
        }
    }
}

/// Inclusive duration bounds in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

/// Inclusive upload-date bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

/// Structured filters applied before scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<Platform>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<DurationRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_subtitles: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

fn default_limit() -> usize {
    20
}

/// A search (or discover) request against the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            filters: SearchFilters::default(),
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A request with no free text is a discover request.
    pub fn is_discover(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn sort_by(&self) -> SortBy {
        self.filters.sort_by.unwrap_or_default()
    }

    /// Reject malformed filter combinations before any adapter runs.
    pub fn validate(&self, max_limit: usize, max_text_len: usize) -> Result<(), QueryError> {
        let len = self.text.chars().count();
        if len > max_text_len {
            return Err(QueryError::TextTooLong {
                len,
                max: max_text_len,
            });
        }
        if self.limit == 0 || self.limit > max_limit {
            return Err(QueryError::Limit {
                got: self.limit,
                max: max_limit,
            });
        }
        if let Some(DurationRange {
            min: Some(min),
            max: Some(max),
        }) = self.filters.duration_seconds
        {
            if min > max {
                return Err(QueryError::DurationRange { min, max });
            }
        }
        if let Some(DateRange {
            from: Some(from),
            to: Some(to),
        }) = self.filters.upload_date
        {
            if from > to {
                return Err(QueryError::DateRange {
                    from: from.to_rfc3339(),
                    to: to.to_rfc3339(),
                });
            }
        }
        Ok(())
    }
}

/// Wire shape of an incoming search: the query plus an optional user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(flatten)]
    pub query: SearchQuery,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Advisory classification of what the user is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchIntent {
    Search,
    Discover,
    Trending,
    Specific,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentGuess {
    pub intent: SearchIntent,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Ok,
    Error,
}

/// Outcome of one adapter call within a single search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub status: SourceState,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub latency_ms: u64,
}

/// Final ranked page returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub items: Vec<ContentItem>,
    pub total_count: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
    pub search_latency_ms: u64,
    pub per_source_status: BTreeMap<String, SourceStatus>,
    /// Every adapter failed; `items` is empty because sources are down, not
    /// because nothing matched.
    pub degraded: bool,
    #[serde(default)]
    pub cached: bool,
    /// Deduplicated candidates before filtering.
    #[serde(default)]
    pub candidate_count: usize,
    #[serde(default)]
    pub intent: Option<IntentGuess>,
}

/// Kind of user interaction fed into the affinity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Like,
    Share,
    Comment,
    Debate,
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(InteractionKind::View),
            "like" => Ok(InteractionKind::Like),
            "share" => Ok(InteractionKind::Share),
            "comment" => Ok(InteractionKind::Comment),
            "debate" => Ok(InteractionKind::Debate),
            other => Err(format!("unknown interaction type: {}", other)),
        }
    }
}

/// Interaction event posted by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub user_id: String,
    pub topic_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_platform_roundtrip_lowercase() {
        let json = serde_json::to_string(&Platform::Youtube).unwrap();
        assert_eq!(json, "\"youtube\"");
        assert_eq!("Twitch".parse::<Platform>().unwrap(), Platform::Twitch);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_search_request_parses_wire_shape() {
        let body = r#"{
            "text": "congress live",
            "filters": {
                "platforms": ["youtube", "twitch"],
                "durationSeconds": {"min": 60, "max": 600},
                "isLive": true,
                "minViews": 100,
                "sortBy": "date"
            },
            "limit": 10,
            "offset": 5,
            "userId": "u-1"
        }"#;
        let req: SearchRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.query.text, "congress live");
        assert_eq!(req.query.filters.platforms, vec![Platform::Youtube, Platform::Twitch]);
        assert_eq!(req.query.filters.is_live, Some(true));
        assert_eq!(req.query.filters.sort_by, Some(SortBy::Date));
        assert_eq!(req.query.limit, 10);
        assert_eq!(req.query.offset, 5);
        assert_eq!(req.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_validate_rejects_inverted_duration() {
        let mut q = SearchQuery::new("budget");
        q.filters.duration_seconds = Some(DurationRange {
            min: Some(600),
            max: Some(60),
        });
        assert_eq!(
            q.validate(100, 256),
            Err(QueryError::DurationRange { min: 600, max: 60 })
        );
    }

    #[test]
    fn test_validate_rejects_inverted_dates_and_bad_limit() {
        let mut q = SearchQuery::new("budget");
        q.filters.upload_date = Some(DateRange {
            from: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
        });
        assert!(matches!(q.validate(100, 256), Err(QueryError::DateRange { .. })));

        let mut q = SearchQuery::new("budget");
        q.limit = 0;
        assert!(matches!(q.validate(100, 256), Err(QueryError::Limit { .. })));
        q.limit = 101;
        assert!(matches!(q.validate(100, 256), Err(QueryError::Limit { .. })));
    }

    #[test]
    fn test_item_defaults_from_sparse_json() {
        let json = r#"{"id": "a1", "platform": "vimeo", "title": "Town hall", "uploadDate": "2024-03-01T12:00:00Z"}"#;
        let item: ContentItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.language, "en");
        assert_eq!(item.views, 0);
        assert!(!item.is_live);
        assert_eq!(item.dominant_topic(), None);
        assert_eq!(item.key(), (Platform::Vimeo, "a1"));
    }

    #[test]
    fn test_interaction_type_field() {
        let ev: Interaction =
            serde_json::from_str(r#"{"userId":"u","topicId":"congress","type":"debate"}"#).unwrap();
        assert_eq!(ev.kind, InteractionKind::Debate);
    }
}
