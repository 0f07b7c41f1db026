use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::models::Platform;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub affinity: AffinityConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregatorConfig {
    /// Overall fan-out deadline across all adapters.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Per-adapter timeout for adapters that don't declare their own.
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
            max_limit: default_max_limit(),
            default_limit: default_limit(),
            max_query_len: default_max_query_len(),
        }
    }
}

fn default_deadline_ms() -> u64 {
    3000
}
fn default_adapter_timeout_ms() -> u64 {
    2500
}
fn default_max_limit() -> usize {
    100
}
fn default_limit() -> usize {
    20
}
fn default_max_query_len() -> usize {
    256
}

/// Weights of the additive ranking formula.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RankingConfig {
    pub title_match: f64,
    pub title_term: f64,
    pub description_match: f64,
    pub description_term: f64,
    pub topic_match: f64,
    /// Multiplier applied to matches on synonym-expanded terms.
    pub synonym_factor: f64,
    pub engagement_scale: f64,
    pub engagement_cap: f64,
    pub fresh_day: f64,
    pub fresh_week: f64,
    pub fresh_month: f64,
    pub freshness_cutoff_days: i64,
    pub fact_checked_bonus: f64,
    pub subtitles_bonus: f64,
    pub verified_bonus: f64,
    pub affinity_scale: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            title_match: 10.0,
            title_term: 3.0,
            description_match: 5.0,
            description_term: 1.0,
            topic_match: 2.0,
            synonym_factor: 0.5,
            engagement_scale: 100.0,
            engagement_cap: 20.0,
            fresh_day: 15.0,
            fresh_week: 10.0,
            fresh_month: 5.0,
            freshness_cutoff_days: 30,
            fact_checked_bonus: 5.0,
            subtitles_bonus: 2.0,
            verified_bonus: 3.0,
            affinity_scale: 20.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    /// Shorter TTL for live-stream queries.
    pub live_ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            live_ttl_secs: 120,
            max_entries: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AffinityConfig {
    pub learning_rate: f64,
    pub decay_factor: f64,
    pub epsilon: f64,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            decay_factor: 0.95,
            epsilon: 0.01,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    pub max_suggestions: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_suggestions: 8 }
    }
}

/// Named adapter instances, grouped by adapter type.
///
/// ```toml
/// [adapters.fixture.offline]
/// platform = "youtube"
/// path = "./fixtures/youtube.json"
///
/// [adapters.catalog.archive]
/// path = "./data/catalog.sqlite"
///
/// [adapters.http.streams]
/// platform = "twitch"
/// kind = "live"
/// base_url = "https://streams.example.org/api/search"
/// api_key_env = "STREAMS_API_KEY"
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdaptersConfig {
    #[serde(default)]
    pub fixture: BTreeMap<String, FixtureAdapterConfig>,
    #[serde(default)]
    pub catalog: BTreeMap<String, CatalogAdapterConfig>,
    #[serde(default)]
    pub http: BTreeMap<String, HttpAdapterConfig>,
}

impl AdaptersConfig {
    pub fn len(&self) -> usize {
        self.fixture.len() + self.catalog.len() + self.http.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FixtureAdapterConfig {
    pub platform: Platform,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogAdapterConfig {
    /// SQLite database holding the cached catalog.
    pub path: PathBuf,
    /// Restrict to one platform's cached items; all platforms when unset.
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpAdapterKind {
    #[default]
    Video,
    Live,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpAdapterConfig {
    pub platform: Platform,
    #[serde(default)]
    pub kind: HttpAdapterKind,
    pub base_url: String,
    /// Environment variable holding a bearer token, if the provider needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_http_timeout_secs() -> u64 {
    4
}
fn default_max_results() -> usize {
    25
}

impl Config {
    /// Config with every default and no adapters, for commands that can run
    /// without a config file.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:7340".to_string(),
            },
            aggregator: AggregatorConfig::default(),
            ranking: RankingConfig::default(),
            cache: CacheConfig::default(),
            affinity: AffinityConfig::default(),
            query: QueryConfig::default(),
            adapters: AdaptersConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    // Aggregator
    if config.aggregator.deadline_ms == 0 {
        anyhow::bail!("aggregator.deadline_ms must be > 0");
    }
    if config.aggregator.adapter_timeout_ms == 0 {
        anyhow::bail!("aggregator.adapter_timeout_ms must be > 0");
    }
    if config.aggregator.default_limit == 0
        || config.aggregator.default_limit > config.aggregator.max_limit
    {
        anyhow::bail!("aggregator.default_limit must be in [1, aggregator.max_limit]");
    }

    // Cache
    if config.cache.ttl_secs == 0 {
        anyhow::bail!("cache.ttl_secs must be > 0");
    }
    if config.cache.live_ttl_secs == 0 || config.cache.live_ttl_secs > config.cache.ttl_secs {
        anyhow::bail!("cache.live_ttl_secs must be in [1, cache.ttl_secs]");
    }
    if config.cache.max_entries == 0 {
        anyhow::bail!("cache.max_entries must be > 0");
    }

    // Affinity
    let aff = &config.affinity;
    if !(aff.decay_factor > 0.0 && aff.decay_factor < 1.0) {
        anyhow::bail!("affinity.decay_factor must be in (0.0, 1.0)");
    }
    if !(aff.learning_rate > 0.0 && aff.learning_rate <= 1.0) {
        anyhow::bail!("affinity.learning_rate must be in (0.0, 1.0]");
    }
    if !(0.0..1.0).contains(&aff.epsilon) {
        anyhow::bail!("affinity.epsilon must be in [0.0, 1.0)");
    }

    if config.query.max_suggestions == 0 {
        anyhow::bail!("query.max_suggestions must be > 0");
    }

    // Adapters
    let mut names = BTreeSet::new();
    let all_names = config
        .adapters
        .fixture
        .keys()
        .chain(config.adapters.catalog.keys())
        .chain(config.adapters.http.keys());
    for name in all_names {
        if !names.insert(name.as_str()) {
            anyhow::bail!("adapter name '{}' is used by more than one [adapters.*] table", name);
        }
    }
    for (name, http) in &config.adapters.http {
        if http.base_url.trim().is_empty() {
            anyhow::bail!("adapters.http.{}.base_url must not be empty", name);
        }
        if http.timeout_secs == 0 {
            anyhow::bail!("adapters.http.{}.timeout_secs must be > 0", name);
        }
    }

    Ok(())
}
