//! Operational statistics and admin overview.
//!
//! Tracks per-source health across searches, counts observed queries and
//! returned topics, and renders the `civic stats` summary. The same
//! [`AdminSnapshot`] backs `GET /admin/stats`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::cache::CacheStats;
use crate::config::Config;
use crate::error::{AdapterError, ErrorDetail};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============ Frequency counting ============

/// Thread-safe string frequency counter.
#[derive(Default)]
pub struct FrequencyCounter {
    counts: Mutex<HashMap<String, u64>>,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &str) {
        *lock(&self.counts).entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, key: &str) -> u64 {
        lock(&self.counts).get(key).copied().unwrap_or(0)
    }

    /// Top `n` keys by count desc, then key asc.
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut all: Vec<(String, u64)> = lock(&self.counts)
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        sort_ranked(&mut all);
        all.truncate(n);
        all
    }

    /// All keys starting with `prefix`, ranked like [`top`](Self::top).
    pub fn with_prefix(&self, prefix: &str) -> Vec<(String, u64)> {
        let mut matched: Vec<(String, u64)> = lock(&self.counts)
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        sort_ranked(&mut matched);
        matched
    }
}

fn sort_ranked(entries: &mut [(String, u64)]) {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
}

// ============ Source health ============

#[derive(Default)]
struct HealthEntry {
    calls: u64,
    successes: u64,
    failures: u64,
    timeouts: u64,
    total_latency_ms: u64,
    last_error: Option<ErrorDetail>,
    last_success_at: Option<DateTime<Utc>>,
}

/// Cumulative health of one adapter across searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub name: String,
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub avg_latency_ms: u64,
    /// Fraction of calls that succeeded, 1.0 before the first call.
    pub uptime: f64,
    pub last_error: Option<ErrorDetail>,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct SourceHealthTracker {
    entries: Mutex<BTreeMap<String, HealthEntry>>,
}

impl SourceHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, name: &str, latency_ms: u64) {
        let mut entries = lock(&self.entries);
        let e = entries.entry(name.to_string()).or_default();
        e.calls += 1;
        e.successes += 1;
        e.total_latency_ms += latency_ms;
        e.last_success_at = Some(Utc::now());
    }

    pub fn record_failure(&self, name: &str, err: &AdapterError, latency_ms: u64) {
        let mut entries = lock(&self.entries);
        let e = entries.entry(name.to_string()).or_default();
        e.calls += 1;
        e.failures += 1;
        if err.is_timeout() {
            e.timeouts += 1;
        }
        e.total_latency_ms += latency_ms;
        e.last_error = Some(err.detail());
    }

    /// Health rows for `names` in the given order. Adapters never called
    /// report zero calls.
    pub fn snapshot<'a, I>(&self, names: I) -> Vec<SourceHealth>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries = lock(&self.entries);
        names
            .into_iter()
            .map(|name| match entries.get(name) {
                Some(e) => SourceHealth {
                    name: name.to_string(),
                    calls: e.calls,
                    successes: e.successes,
                    failures: e.failures,
                    timeouts: e.timeouts,
                    avg_latency_ms: if e.calls > 0 { e.total_latency_ms / e.calls } else { 0 },
                    uptime: if e.calls > 0 {
                        e.successes as f64 / e.calls as f64
                    } else {
                        1.0
                    },
                    last_error: e.last_error.clone(),
                    last_success_at: e.last_success_at,
                },
                None => SourceHealth {
                    name: name.to_string(),
                    calls: 0,
                    successes: 0,
                    failures: 0,
                    timeouts: 0,
                    avg_latency_ms: 0,
                    uptime: 1.0,
                    last_error: None,
                    last_success_at: None,
                },
            })
            .collect()
    }
}

// ============ Admin snapshot ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    pub key: String,
    pub count: u64,
}

impl From<(String, u64)> for CountEntry {
    fn from((key, count): (String, u64)) -> Self {
        Self { key, count }
    }
}

/// Point-in-time operational overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSnapshot {
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<SourceHealth>,
    pub cache: CacheStats,
    pub top_queries: Vec<CountEntry>,
    pub top_topics: Vec<CountEntry>,
    pub users_tracked: usize,
}

/// Fetch `GET /admin/stats` from a running server and print it.
pub async fn run_stats(config: &Config, url: Option<&str>) -> anyhow::Result<()> {
    let base = match url {
        Some(u) => u.trim_end_matches('/').to_string(),
        None => format!("http://{}", config.server.bind),
    };
    let endpoint = format!("{}/admin/stats", base);

    let snapshot: AdminSnapshot = reqwest::Client::new()
        .get(&endpoint)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(|e| anyhow::anyhow!("Could not reach {}: {}. Is `civic serve` running?", endpoint, e))?
        .json()
        .await?;

    print_snapshot(&snapshot);
    Ok(())
}

/// Print a snapshot as the `civic stats` table.
pub fn print_snapshot(snapshot: &AdminSnapshot) {
    println!("Civic Discovery — Stats");
    println!("=======================");
    println!();
    println!(
        "  Cache:       {} entries ({}), {} hits / {} misses",
        snapshot.cache.entries,
        format_bytes(snapshot.cache.bytes),
        snapshot.cache.hits,
        snapshot.cache.misses
    );
    println!("  Users:       {}", snapshot.users_tracked);

    if !snapshot.sources.is_empty() {
        println!();
        println!("  By source:");
        println!(
            "  {:<20} {:>6} {:>6} {:>8} {:>8} {:>7}   {}",
            "SOURCE", "CALLS", "OK", "FAILED", "TIMEOUT", "AVG MS", "LAST OK"
        );
        println!("  {}", "-".repeat(80));
        for s in &snapshot.sources {
            let last_ok = match s.last_success_at {
                Some(ts) => format_ts_relative(ts.timestamp()),
                None => "never".to_string(),
            };
            println!(
                "  {:<20} {:>6} {:>6} {:>8} {:>8} {:>7}   {}",
                s.name, s.calls, s.successes, s.failures, s.timeouts, s.avg_latency_ms, last_ok
            );
        }
    }

    for (title, rows) in [
        ("Top queries", &snapshot.top_queries),
        ("Top topics", &snapshot.top_topics),
    ] {
        if rows.is_empty() {
            continue;
        }
        println!();
        println!("  {}:", title);
        for row in rows {
            println!("    {:>5}  {}", row.count, row.key);
        }
    }

    println!();
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
pub fn format_ts_relative(ts: i64) -> String {
    let now = Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_counter_ranking() {
        let c = FrequencyCounter::new();
        for key in ["budget", "climate", "budget", "census", "climate", "budget"] {
            c.record(key);
        }
        assert_eq!(
            c.top(2),
            vec![("budget".to_string(), 3), ("climate".to_string(), 2)]
        );
        assert_eq!(c.get("census"), 1);
        assert_eq!(c.get("missing"), 0);
        let prefixed: Vec<String> = c.with_prefix("c").into_iter().map(|(k, _)| k).collect();
        assert_eq!(prefixed, vec!["climate", "census"]);
    }

    #[test]
    fn test_health_tracker_counts_timeouts() {
        let t = SourceHealthTracker::new();
        t.record_success("yt", 100);
        t.record_failure("yt", &AdapterError::Timeout { after_ms: 2500 }, 2500);
        t.record_failure("yt", &AdapterError::RateLimited, 50);

        let rows = t.snapshot(["yt", "idle"]);
        assert_eq!(rows.len(), 2);
        let yt = &rows[0];
        assert_eq!(yt.calls, 3);
        assert_eq!(yt.successes, 1);
        assert_eq!(yt.failures, 2);
        assert_eq!(yt.timeouts, 1);
        assert_eq!(yt.avg_latency_ms, 883);
        assert!((yt.uptime - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(yt.last_error.as_ref().map(|e| e.kind.as_str()), Some("rate_limited"));
        assert!(yt.last_success_at.is_some());

        assert_eq!(rows[1].calls, 0);
        assert_eq!(rows[1].uptime, 1.0);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
