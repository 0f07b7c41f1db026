//! HTTP JSON adapter for video platforms and live-stream directories.
//!
//! Calls a provider search endpoint with `GET {base_url}?q=<text>&limit=<n>`
//! and maps the JSON payload into [`ContentItem`]s. Two payload shapes are
//! understood, selected by `kind`:
//!
//! | Kind | Payload | Notes |
//! |------|---------|-------|
//! | `video` | `{ "items": [...] }` | ISO-8601 or clock durations, thumbnail list, statistics, channel |
//! | `live` | `{ "streams": [...] }` | viewer count as views, thumbnail URL template, always live |
//!
//! # Configuration
//!
//! ```toml
//! [adapters.http.videos]
//! platform = "youtube"
//! kind = "video"
//! base_url = "https://videos.example.org/api/search"
//! api_key_env = "VIDEOS_API_KEY"
//! timeout_secs = 4
//! ```
//!
//! # Failure mapping
//!
//! - HTTP 429 → `rate_limited`
//! - HTTP 5xx, connection errors, other non-success statuses → `unavailable`
//! - client timeout → `timeout`
//! - undecodable body → `malformed_response`

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::{HttpAdapterConfig, HttpAdapterKind};
use crate::error::AdapterError;
use crate::models::{Author, ContentItem, Platform, SearchQuery};
use crate::normalize::{best_thumbnail, extract_keywords, infer_topics, normalize_tags, parse_duration, Thumbnail};
use crate::traits::SourceAdapter;

const MAX_KEYWORDS: usize = 8;

pub struct HttpAdapter {
    name: String,
    config: HttpAdapterConfig,
    client: reqwest::Client,
}

impl HttpAdapter {
    pub fn new(name: String, config: HttpAdapterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .with_context(|| format!("Failed to build HTTP client for adapter {}", name))?;
        Ok(Self {
            name,
            config,
            client,
        })
    }

    fn timeout_error(&self) -> AdapterError {
        AdapterError::Timeout {
            after_ms: self.config.timeout_secs * 1000,
        }
    }
}

#[async_trait]
impl SourceAdapter for HttpAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> Platform {
        self.config.platform
    }

    fn description(&self) -> &str {
        match self.config.kind {
            HttpAdapterKind::Video => "Search a video platform over HTTP",
            HttpAdapterKind::Live => "Search a live-stream directory over HTTP",
        }
    }

    fn adapter_type(&self) -> &str {
        "http"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.config.timeout_secs))
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<ContentItem>, AdapterError> {
        let limit = self.config.max_results.to_string();
        let mut req = self
            .client
            .get(&self.config.base_url)
            .query(&[("q", query.text.trim()), ("limit", limit.as_str())]);

        if let Some(var) = &self.config.api_key_env {
            match std::env::var(var) {
                Ok(key) => req = req.bearer_auth(key),
                Err(_) => {
                    return Err(AdapterError::Unavailable(format!("{} not set", var)));
                }
            }
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error()
            } else {
                AdapterError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AdapterError::RateLimited);
        }
        if !status.is_success() {
            return Err(AdapterError::Unavailable(format!("HTTP {}", status)));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error()
            } else {
                AdapterError::Unavailable(e.to_string())
            }
        })?;

        let items = match self.config.kind {
            HttpAdapterKind::Video => parse_video_page(&body, self.config.platform)?,
            HttpAdapterKind::Live => parse_live_page(&body, self.config.platform)?,
        };
        debug!(adapter = %self.name, count = items.len(), "HTTP adapter fetched items.");
        Ok(items)
    }
}

// ============ Video payloads ============

#[derive(Debug, Deserialize)]
struct VideoPage {
    #[serde(default)]
    items: Vec<VideoPayload>,
}

#[derive(Debug, Deserialize)]
struct VideoPayload {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    published_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    statistics: VideoStatistics,
    #[serde(default)]
    channel: ChannelPayload,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    captions: bool,
    #[serde(default)]
    live: bool,
    #[serde(default)]
    fact_checked: bool,
    #[serde(default)]
    content_rating: Option<String>,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VideoStatistics {
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    comments: u64,
    #[serde(default)]
    shares: u64,
    #[serde(default)]
    saves: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    subscribers: u64,
}

fn parse_video_page(body: &str, platform: Platform) -> Result<Vec<ContentItem>, AdapterError> {
    let page: VideoPage = serde_json::from_str(body)?;
    Ok(page
        .items
        .into_iter()
        .map(|v| map_video(v, platform))
        .collect())
}

fn map_video(v: VideoPayload, platform: Platform) -> ContentItem {
    let text = format!("{} {} {}", v.title, v.description, v.tags.join(" "));
    let mut item = ContentItem::new(platform, v.id, v.title, v.published_at);

    item.description = v.description;
    item.category = v.category.unwrap_or_default();
    item.tags = normalize_tags(&v.tags);
    item.topics = infer_topics(&text);
    item.keywords = extract_keywords(&text, MAX_KEYWORDS);
    if let Some(lang) = v.language {
        item.language = lang;
    }

    item.views = v.statistics.views;
    item.likes = v.statistics.likes;
    item.comments = v.statistics.comments;
    item.shares = v.statistics.shares;
    item.saves = v.statistics.saves;

    item.duration_seconds = v.duration.as_deref().and_then(parse_duration).unwrap_or(0);
    item.published_at = Some(v.published_at);
    item.last_updated = v.updated_at;
    item.is_live = v.live;

    item.fact_checked = v.fact_checked;
    item.has_subtitles = v.captions;
    if let Some(rating) = v.content_rating {
        item.content_rating = rating;
    }
    item.moderation_flags = normalize_tags(&v.flags);

    item.author = Author {
        id: v.channel.id,
        name: v.channel.name,
        verified: v.channel.verified,
        follower_count: v.channel.subscribers,
    };
    item.thumbnail_url = best_thumbnail(&v.thumbnails).map(|t| t.url.clone());
    item.url = v.url;
    item
}

// ============ Live-stream payloads ============

#[derive(Debug, Deserialize)]
struct LivePage {
    #[serde(default)]
    streams: Vec<StreamPayload>,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    user_name: String,
    title: String,
    #[serde(default)]
    game_name: Option<String>,
    #[serde(default)]
    viewer_count: u64,
    started_at: DateTime<Utc>,
    #[serde(default)]
    language: Option<String>,
    /// Template with `{width}` and `{height}` placeholders.
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    is_mature: bool,
    #[serde(default)]
    partner: bool,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    url: Option<String>,
}

/// Largest rendition requested from thumbnail URL templates.
const LIVE_THUMB_WIDTH: u32 = 1920;
const LIVE_THUMB_HEIGHT: u32 = 1080;

fn parse_live_page(body: &str, platform: Platform) -> Result<Vec<ContentItem>, AdapterError> {
    let page: LivePage = serde_json::from_str(body)?;
    Ok(page
        .streams
        .into_iter()
        .map(|s| map_stream(s, platform))
        .collect())
}

fn map_stream(s: StreamPayload, platform: Platform) -> ContentItem {
    let text = format!("{} {}", s.title, s.tags.join(" "));
    let mut item = ContentItem::new(platform, s.id, s.title, s.started_at);

    item.category = s.game_name.unwrap_or_default();
    item.tags = normalize_tags(&s.tags);
    item.topics = infer_topics(&text);
    item.keywords = extract_keywords(&text, MAX_KEYWORDS);
    if let Some(lang) = s.language {
        item.language = lang;
    }

    item.views = s.viewer_count;
    item.duration_seconds = 0;
    item.published_at = Some(s.started_at);
    item.is_live = true;
    if s.is_mature {
        item.content_rating = "mature".to_string();
    }

    item.author = Author {
        id: s.user_id,
        name: s.user_name,
        verified: s.partner,
        follower_count: s.followers,
    };
    item.thumbnail_url = s.thumbnail_url.map(|t| {
        t.replace("{width}", &LIVE_THUMB_WIDTH.to_string())
            .replace("{height}", &LIVE_THUMB_HEIGHT.to_string())
    });
    item.url = s.url;
    item
}
