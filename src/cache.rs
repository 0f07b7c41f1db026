//! In-memory, TTL-bounded cache of final search results.
//!
//! Keys are SHA-256 digests of a canonical JSON rendering of the query, so
//! filter order and text case never split the cache. Payloads are stored as
//! serialized JSON; an entry that no longer decodes is treated as a miss and
//! dropped. Live queries get the shorter `live_ttl_secs`.
//!
//! The cache is an accelerator only. Every miss falls back to a full
//! aggregator run.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::models::{SearchQuery, SearchResult};

/// Digest of a canonical query, plus whether it asks for live content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub digest: String,
    pub live: bool,
}

impl CacheKey {
    pub fn short(&self) -> &str {
        &self.digest[..12.min(self.digest.len())]
    }
}

#[derive(Serialize)]
struct CanonicalQuery<'a> {
    text: String,
    platforms: Vec<&'static str>,
    categories: Vec<String>,
    duration_min: Option<u64>,
    duration_max: Option<u64>,
    uploaded_from: Option<String>,
    uploaded_to: Option<String>,
    has_subtitles: Option<bool>,
    is_live: Option<bool>,
    min_views: Option<u64>,
    sort_by: &'static str,
    limit: usize,
    offset: usize,
    user_id: Option<&'a str>,
}

/// Order-independent serialization of `query` (and the user, for
/// personalized pages).
pub fn canonical_key(query: &SearchQuery, user_id: Option<&str>) -> String {
    let f = &query.filters;

    let mut platforms: Vec<&'static str> = f.platforms.iter().map(|p| p.as_str()).collect();
    platforms.sort_unstable();
    platforms.dedup();

    let mut categories: Vec<String> = f.categories.iter().map(|c| c.trim().to_lowercase()).collect();
    categories.sort();
    categories.dedup();

    let canonical = CanonicalQuery {
        text: query
            .text
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" "),
        platforms,
        categories,
        duration_min: f.duration_seconds.and_then(|d| d.min),
        duration_max: f.duration_seconds.and_then(|d| d.max),
        uploaded_from: f.upload_date.and_then(|d| d.from).map(|t| t.to_rfc3339()),
        uploaded_to: f.upload_date.and_then(|d| d.to).map(|t| t.to_rfc3339()),
        has_subtitles: f.has_subtitles,
        is_live: f.is_live,
        min_views: f.min_views,
        sort_by: query.sort_by().as_str(),
        limit: query.limit,
        offset: query.offset,
        user_id,
    };

    // Serializing plain strings, numbers, and options cannot fail.
    serde_json::to_string(&canonical).unwrap_or_default()
}

pub fn cache_key(query: &SearchQuery, user_id: Option<&str>) -> CacheKey {
    let digest = Sha256::digest(canonical_key(query, user_id).as_bytes());
    CacheKey {
        digest: hex::encode(digest),
        live: query.filters.is_live == Some(true),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Approximate footprint of keys and payloads.
    pub bytes: u64,
}

struct Entry {
    payload: Vec<u8>,
    inserted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Entry {
    /// An entry is still served at exactly its TTL and expires just after.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

pub struct ResultCache {
    config: CacheConfig,
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        let secs = if key.live {
            self.config.live_ttl_secs
        } else {
            self.config.ttl_secs
        };
        Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
    }

    pub fn get(&self, key: &CacheKey) -> Option<SearchResult> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<SearchResult> {
        if !self.config.enabled {
            return None;
        }

        let decoded = {
            let entries = self.read();
            match entries.get(&key.digest) {
                None => None,
                Some(entry) if entry.is_expired(now) => Some(Err(None)),
                Some(entry) => Some(
                    serde_json::from_slice::<SearchResult>(&entry.payload).map_err(Some),
                ),
            }
        };

        match decoded {
            Some(Ok(result)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key_prefix = %key.short(), "Cache hit.");
                Some(result)
            }
            Some(Err(corrupt)) => {
                if let Some(err) = corrupt {
                    warn!(cache_key_prefix = %key.short(), error = %err, "Dropping undecodable cache entry.");
                }
                self.write().remove(&key.digest);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key_prefix = %key.short(), "Cache miss.");
                None
            }
        }
    }

    pub fn put(&self, key: &CacheKey, result: &SearchResult) {
        self.put_at(key, result, Utc::now())
    }

    /// Store `result` under `key`. Last write wins.
    pub fn put_at(&self, key: &CacheKey, result: &SearchResult, now: DateTime<Utc>) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }
        let payload = match serde_json::to_vec(result) {
            Ok(p) => p,
            Err(e) => {
                warn!(cache_key_prefix = %key.short(), error = %e, "Failed to serialize result for cache.");
                return;
            }
        };
        let entry = Entry {
            payload,
            inserted_at: now,
            expires_at: now + self.ttl_for(key),
        };
        self.insert_entry(key.digest.clone(), entry, now);
    }

    fn insert_entry(&self, digest: String, entry: Entry, now: DateTime<Utc>) {
        let mut entries = self.write();
        if !entries.contains_key(&digest) && entries.len() >= self.config.max_entries {
            entries.retain(|_, e| !e.is_expired(now));
            if entries.len() >= self.config.max_entries {
                let oldest = entries
                    .iter()
                    .min_by(|a, b| a.1.inserted_at.cmp(&b.1.inserted_at).then(a.0.cmp(b.0)))
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(digest, entry);
    }

    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    /// Remove every entry expired at `now`; returns how many were removed.
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.read();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            enabled: self.config.enabled,
            entries: entries.len(),
            hits,
            misses,
            hit_rate: if lookups > 0 { hits as f64 / lookups as f64 } else { 0.0 },
            bytes: entries
                .iter()
                .map(|(k, e)| (k.len() + e.payload.len()) as u64)
                .sum(),
        }
    }

    #[cfg(test)]
    fn insert_raw(&self, key: &CacheKey, payload: Vec<u8>, now: DateTime<Utc>) {
        let entry = Entry {
            payload,
            inserted_at: now,
            expires_at: now + self.ttl_for(key),
        };
        self.insert_entry(key.digest.clone(), entry, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn result(total: usize) -> SearchResult {
        SearchResult {
            items: Vec::new(),
            total_count: total,
            has_more: false,
            next_offset: None,
            search_latency_ms: 12,
            per_source_status: BTreeMap::new(),
            degraded: false,
            cached: false,
            candidate_count: total,
            intent: None,
        }
    }

    fn cache() -> ResultCache {
        ResultCache::new(CacheConfig::default())
    }

    #[test]
    fn test_key_is_order_and_case_independent() {
        let mut a = SearchQuery::new("Congress  Hearing");
        a.filters.platforms = vec![Platform::Twitch, Platform::Youtube];
        a.filters.categories = vec!["News".into(), "politics".into()];
        let mut b = SearchQuery::new("congress hearing");
        b.filters.platforms = vec![Platform::Youtube, Platform::Twitch];
        b.filters.categories = vec!["Politics".into(), "news".into()];
        assert_eq!(cache_key(&a, None), cache_key(&b, None));
        assert_eq!(cache_key(&a, None).digest.len(), 64);
    }

    #[test]
    fn test_key_varies_with_pagination_and_user() {
        let q = SearchQuery::new("congress");
        let mut paged = q.clone();
        paged.offset = 20;
        assert_ne!(cache_key(&q, None), cache_key(&paged, None));
        assert_ne!(cache_key(&q, None), cache_key(&q, Some("u1")));
        assert_ne!(cache_key(&q, Some("u1")), cache_key(&q, Some("u2")));
    }

    #[test]
    fn test_hit_then_expire() {
        let c = cache();
        let key = cache_key(&SearchQuery::new("budget"), None);
        assert!(c.get_at(&key, t0()).is_none());
        c.put_at(&key, &result(3), t0());
        assert_eq!(c.get_at(&key, t0() + Duration::seconds(299)).map(|r| r.total_count), Some(3));
        assert_eq!(c.get_at(&key, t0() + Duration::seconds(300)).map(|r| r.total_count), Some(3));
        assert!(c.get_at(&key, t0() + Duration::seconds(301)).is_none());
        assert!(c.is_empty());

        let stats = c.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_live_queries_use_short_ttl() {
        let c = cache();
        let mut q = SearchQuery::new("senate");
        q.filters.is_live = Some(true);
        let key = cache_key(&q, None);
        assert!(key.live);
        c.put_at(&key, &result(1), t0());
        assert!(c.get_at(&key, t0() + Duration::seconds(120)).is_some());
        assert!(c.get_at(&key, t0() + Duration::seconds(121)).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_removed() {
        let c = cache();
        let key = cache_key(&SearchQuery::new("climate"), None);
        c.insert_raw(&key, b"{not json".to_vec(), t0());
        assert_eq!(c.len(), 1);
        assert!(c.get_at(&key, t0()).is_none());
        assert_eq!(c.len(), 0);
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn test_evict_expired_and_capacity() {
        let c = ResultCache::new(CacheConfig {
            max_entries: 2,
            ..Default::default()
        });
        let k1 = cache_key(&SearchQuery::new("one"), None);
        let k2 = cache_key(&SearchQuery::new("two"), None);
        let k3 = cache_key(&SearchQuery::new("three"), None);
        c.put_at(&k1, &result(1), t0());
        c.put_at(&k2, &result(2), t0() + Duration::seconds(1));
        c.put_at(&k3, &result(3), t0() + Duration::seconds(2));
        assert_eq!(c.len(), 2);
        assert!(c.get_at(&k1, t0() + Duration::seconds(3)).is_none());
        assert!(c.get_at(&k3, t0() + Duration::seconds(3)).is_some());

        assert_eq!(c.evict_expired_at(t0() + Duration::seconds(301)), 0);
        assert_eq!(c.evict_expired_at(t0() + Duration::seconds(302)), 1);
        assert_eq!(c.evict_expired_at(t0() + Duration::seconds(400)), 1);
        assert!(c.is_empty());
        assert_eq!(c.stats().bytes, 0);
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let c = ResultCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let key = cache_key(&SearchQuery::new("x"), None);
        c.put_at(&key, &result(1), t0());
        assert!(c.get_at(&key, t0()).is_none());
        assert!(c.is_empty());
    }
}
