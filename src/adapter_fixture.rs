//! Deterministic fixture adapter.
//!
//! Serves Content Items from a JSON file (or an in-memory list) without any
//! network access. Used for offline development, demos, and tests.
//!
//! # Configuration
//!
//! ```toml
//! [adapters.fixture.offline]
//! platform = "youtube"
//! path = "./fixtures/youtube.json"
//! ```
//!
//! The file holds a JSON array of items in the same camelCase shape the
//! search API returns. Items are returned in file order.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use crate::config::FixtureAdapterConfig;
use crate::error::AdapterError;
use crate::models::{ContentItem, Platform, Scores, SearchQuery};
use crate::normalize::{query_terms, search_haystack};
use crate::traits::SourceAdapter;

pub struct FixtureAdapter {
    name: String,
    platform: Platform,
    items: Vec<ContentItem>,
}

impl FixtureAdapter {
    pub fn new(name: impl Into<String>, platform: Platform, items: Vec<ContentItem>) -> Self {
        let items = items
            .into_iter()
            .map(|mut item| {
                if item.platform_display_name.is_empty() {
                    item.platform_display_name = item.platform.display_name().to_string();
                }
                item.scores = Scores::default();
                item
            })
            .collect();
        Self {
            name: name.into(),
            platform,
            items,
        }
    }

    pub fn from_file(name: String, config: &FixtureAdapterConfig) -> Result<Self> {
        let items = load_fixture_items(&config.path)?;
        Ok(Self::new(name, config.platform, items))
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }
}

/// Read a JSON array of items from disk.
pub fn load_fixture_items(path: &Path) -> Result<Vec<ContentItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
    let items: Vec<ContentItem> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture file: {}", path.display()))?;
    Ok(items)
}

#[async_trait]
impl SourceAdapter for FixtureAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn description(&self) -> &str {
        "Serve items from a local JSON fixture"
    }

    fn adapter_type(&self) -> &str {
        "fixture"
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<ContentItem>, AdapterError> {
        let terms = query_terms(&query.text);
        if terms.is_empty() {
            return Ok(self.items.clone());
        }

        Ok(self
            .items
            .iter()
            .filter(|item| {
                let haystack = search_haystack(item);
                terms.iter().any(|t| haystack.contains(t.as_str()))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Write;

    fn items() -> Vec<ContentItem> {
        let now = Utc::now();
        let mut a = ContentItem::new(Platform::Youtube, "a", "Senate budget hearing", now);
        a.platform_display_name.clear();
        let mut b = ContentItem::new(Platform::Youtube, "b", "City council recap", now);
        b.tags.insert("zoning".into());
        vec![a, b]
    }

    #[tokio::test]
    async fn test_fetch_filters_by_terms() {
        let adapter = FixtureAdapter::new("yt", Platform::Youtube, items());
        let hits = adapter.fetch(&SearchQuery::new("budget")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].platform_display_name, "YouTube");

        let hits = adapter.fetch(&SearchQuery::new("zoning")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn test_short_words_do_not_match_inside_longer_ones() {
        let now = Utc::now();
        let adapter = FixtureAdapter::new(
            "yt",
            Platform::Youtube,
            vec![
                ContentItem::new(Platform::Youtube, "recap", "Congress session recap", now),
                ContentItem::new(Platform::Youtube, "zoning", "Zoning board", now),
            ],
        );
        let hits = adapter.fetch(&SearchQuery::new("hearing on zoning")).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["zoning"]);
    }

    #[tokio::test]
    async fn test_discover_returns_everything_in_order() {
        let adapter = FixtureAdapter::new("yt", Platform::Youtube, items());
        let hits = adapter.fetch(&SearchQuery::new("  ")).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"x","platform":"vimeo","title":"Town hall","uploadDate":"2024-01-01T00:00:00Z"}}]"#
        )
        .unwrap();
        let cfg = FixtureAdapterConfig {
            platform: Platform::Vimeo,
            path: file.path().to_path_buf(),
        };
        let adapter = FixtureAdapter::from_file("v".into(), &cfg).unwrap();
        assert_eq!(adapter.items().len(), 1);
        assert_eq!(adapter.items()[0].platform_display_name, "Vimeo");
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let cfg = FixtureAdapterConfig {
            platform: Platform::Vimeo,
            path: file.path().to_path_buf(),
        };
        let err = FixtureAdapter::from_file("v".into(), &cfg).err().unwrap();
        assert!(err.to_string().contains("Failed to parse fixture file"));
    }
}
