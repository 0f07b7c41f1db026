//! Locally cached catalog adapter.
//!
//! Serves items previously imported into a SQLite database, so discovery
//! keeps working when upstream providers are slow or unreachable.
//!
//! # Configuration
//!
//! ```toml
//! [adapters.catalog.archive]
//! path = "./data/catalog.sqlite"
//! # platform = "youtube"   # restrict to one platform's cached items
//! max_results = 25
//! ```
//!
//! # Populating
//!
//! ```bash
//! civic catalog init
//! civic catalog import ./exports/items.json
//! ```
//!
//! Matching is a case-insensitive `LIKE` over a denormalized search column
//! (title, description, tags, topics, keywords, author). Results are newest
//! first.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tokio::sync::OnceCell;
use tracing::warn;

use crate::adapter_fixture::load_fixture_items;
use crate::config::{CatalogAdapterConfig, Config};
use crate::db;
use crate::error::AdapterError;
use crate::migrate;
use crate::models::{ContentItem, Platform, Scores, SearchQuery};
use crate::normalize::{query_terms, search_haystack};
use crate::traits::SourceAdapter;

pub struct CatalogAdapter {
    name: String,
    config: CatalogAdapterConfig,
    pool: OnceCell<SqlitePool>,
}

impl CatalogAdapter {
    pub fn new(name: String, config: CatalogAdapterConfig) -> Self {
        Self {
            name,
            config,
            pool: OnceCell::new(),
        }
    }

    async fn pool(&self) -> Result<&SqlitePool, AdapterError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = db::connect(&self.config.path).await?;
                migrate::migrate_pool(&pool).await?;
                Ok::<_, anyhow::Error>(pool)
            })
            .await
            .map_err(|e| AdapterError::Unavailable(format!("catalog database: {}", e)))
    }
}

#[async_trait]
impl SourceAdapter for CatalogAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> Platform {
        self.config.platform.unwrap_or(Platform::Catalog)
    }

    fn description(&self) -> &str {
        "Serve items from the locally cached SQLite catalog"
    }

    fn adapter_type(&self) -> &str {
        "catalog"
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<ContentItem>, AdapterError> {
        let pool = self.pool().await?;
        let terms = query_terms(&query.text);

        let mut sql = String::from("SELECT platform, id, item_json FROM catalog_items WHERE 1 = 1");
        if self.config.platform.is_some() {
            sql.push_str(" AND platform = ?");
        }
        if !terms.is_empty() {
            let clauses: Vec<&str> = terms.iter().map(|_| "search_text LIKE ?").collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
        sql.push_str(" ORDER BY upload_date DESC, id ASC LIMIT ?");

        let mut q = sqlx::query(&sql);
        if let Some(platform) = self.config.platform {
            q = q.bind(platform.as_str());
        }
        for term in &terms {
            q = q.bind(format!("%{}%", term));
        }
        q = q.bind(self.config.max_results as i64);

        let rows = q
            .fetch_all(pool)
            .await
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let json: String = row.get("item_json");
            match serde_json::from_str::<ContentItem>(&json) {
                Ok(mut item) => {
                    item.scores = Scores::default();
                    items.push(item);
                }
                Err(e) => {
                    let id: String = row.get("id");
                    let platform: String = row.get("platform");
                    warn!(adapter = %self.name, %platform, %id, error = %e, "Skipping undecodable catalog row.");
                }
            }
        }

        Ok(items)
    }
}

/// Upsert `items` into the catalog. Returns the number of rows written.
pub async fn import_items(pool: &SqlitePool, items: &[ContentItem]) -> Result<usize> {
    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for item in items {
        let mut stored = item.clone();
        stored.scores = Scores::default();
        if stored.platform_display_name.is_empty() {
            stored.platform_display_name = stored.platform.display_name().to_string();
        }
        let json = serde_json::to_string(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO catalog_items (platform, id, title, search_text, upload_date, is_live, item_json, imported_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(platform, id) DO UPDATE SET
                title = excluded.title,
                search_text = excluded.search_text,
                upload_date = excluded.upload_date,
                is_live = excluded.is_live,
                item_json = excluded.item_json,
                imported_at = excluded.imported_at
            "#,
        )
        .bind(stored.platform.as_str())
        .bind(&stored.id)
        .bind(&stored.title)
        .bind(search_haystack(&stored))
        .bind(stored.upload_date.timestamp())
        .bind(stored.is_live)
        .bind(json)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(items.len())
}

/// Number of cached items, for `civic sources`.
pub async fn count_items(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Pick the catalog named `name`, or the only configured one.
pub fn resolve_catalog<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> Result<(&'a str, &'a CatalogAdapterConfig)> {
    let catalogs = &config.adapters.catalog;
    match name {
        Some(name) => match catalogs.get_key_value(name) {
            Some((k, v)) => Ok((k.as_str(), v)),
            None => bail!("No catalog adapter named '{}' in config", name),
        },
        None => {
            let mut iter = catalogs.iter();
            match (iter.next(), iter.next()) {
                (Some((k, v)), None) => Ok((k.as_str(), v)),
                (None, _) => bail!("No [adapters.catalog.<name>] section in config"),
                (Some(_), Some(_)) => bail!("Multiple catalogs configured; pass --name"),
            }
        }
    }
}

/// `civic catalog init`
pub async fn run_catalog_init(config: &Config, name: Option<&str>) -> Result<()> {
    let (name, cfg) = resolve_catalog(config, name)?;
    migrate::run_migrations(&cfg.path).await?;
    println!("Catalog '{}' initialized at {}.", name, cfg.path.display());
    Ok(())
}

/// `civic catalog import <file>`
pub async fn run_catalog_import(
    config: &Config,
    name: Option<&str>,
    file: &std::path::Path,
) -> Result<()> {
    let (name, cfg) = resolve_catalog(config, name)?;
    let items = load_fixture_items(file)?;

    let pool = db::connect(&cfg.path).await?;
    migrate::migrate_pool(&pool).await?;
    let written = import_items(&pool, &items).await?;
    let total = count_items(&pool).await?;
    pool.close().await;

    println!(
        "Imported {} items into catalog '{}' ({} total).",
        written, name, total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn item(platform: Platform, id: &str, title: &str, age_days: i64) -> ContentItem {
        ContentItem::new(platform, id, title, Utc::now() - Duration::days(age_days))
    }

    async fn seeded(tmp: &TempDir, platform: Option<Platform>) -> CatalogAdapter {
        let path = tmp.path().join("catalog.sqlite");
        migrate::run_migrations(&path).await.unwrap();
        let pool = db::connect(&path).await.unwrap();
        let n = import_items(
            &pool,
            &[
                item(Platform::Youtube, "y1", "Senate budget hearing", 3),
                item(Platform::Youtube, "y2", "Senate floor vote", 1),
                item(Platform::Vimeo, "v1", "School board meeting", 2),
            ],
        )
        .await
        .unwrap();
        assert_eq!(n, 3);
        assert_eq!(count_items(&pool).await.unwrap(), 3);
        pool.close().await;

        CatalogAdapter::new(
            "archive".into(),
            CatalogAdapterConfig {
                path,
                platform,
                max_results: 10,
            },
        )
    }

    #[tokio::test]
    async fn test_fetch_matches_terms_newest_first() {
        let tmp = TempDir::new().unwrap();
        let adapter = seeded(&tmp, None).await;
        let hits = adapter.fetch(&SearchQuery::new("senate")).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["y2", "y1"]);
        assert_eq!(adapter.platform(), Platform::Catalog);
    }

    #[tokio::test]
    async fn test_fetch_respects_platform_restriction() {
        let tmp = TempDir::new().unwrap();
        let adapter = seeded(&tmp, Some(Platform::Vimeo)).await;
        let hits = adapter.fetch(&SearchQuery::new("")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "v1");
    }

    #[tokio::test]
    async fn test_import_is_upsert() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.sqlite");
        migrate::run_migrations(&path).await.unwrap();
        let pool = db::connect(&path).await.unwrap();
        import_items(&pool, &[item(Platform::Youtube, "y1", "Old title", 1)])
            .await
            .unwrap();
        import_items(&pool, &[item(Platform::Youtube, "y1", "New title", 1)])
            .await
            .unwrap();
        assert_eq!(count_items(&pool).await.unwrap(), 1);
        let title: String = sqlx::query_scalar("SELECT title FROM catalog_items WHERE id = 'y1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(title, "New title");
    }
}
