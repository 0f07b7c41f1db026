//! Search pipeline orchestration.
//!
//! # Pipeline
//!
//! ```text
//!  SearchQuery ──▶ validate ──▶ cache lookup ──hit──▶ SearchResult (cached)
//!                                   │ miss
//!                                   ▼
//!                          enhance + merge filters
//!                                   │
//!                  ┌────────────────┼────────────────┐
//!                  ▼                ▼                ▼
//!              adapter A        adapter B        adapter C     (JoinSet, per-adapter
//!                  │                │                │          timeout + deadline)
//!                  └────────────────┼────────────────┘
//!                                   ▼
//!                 merge + dedup (registration order)
//!                                   ▼
//!             rank (filters, scores, affinities) ──▶ paginate
//!                                   ▼
//!                       cache write ──▶ SearchResult
//! ```
//!
//! A failing or slow adapter never fails the request: its error is recorded
//! in `perSourceStatus` and the remaining adapters' items are returned.
//! When no adapter succeeds, or none is registered, the result is empty and
//! flagged `degraded`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::affinity::AffinityStore;
use crate::cache::{cache_key, ResultCache};
use crate::config::{AggregatorConfig, Config, RankingConfig};
use crate::error::{AdapterError, QueryError};
use crate::models::{
    ContentItem, Interaction, Platform, SearchQuery, SearchResult, SourceState, SourceStatus,
};
use crate::query::{enhance, QueryUnderstanding};
use crate::ranking::{paginate, Ranker};
use crate::stats::{AdminSnapshot, CountEntry, FrequencyCounter, SourceHealthTracker};
use crate::traits::AdapterRegistry;

const TOP_N: usize = 10;

/// Merged output of one fan-out.
#[derive(Debug, Clone)]
pub struct FanOut {
    /// Deduplicated items, in adapter registration order.
    pub items: Vec<ContentItem>,
    pub per_source_status: BTreeMap<String, SourceStatus>,
}

impl FanOut {
    /// No adapter returned items, either because all failed or because
    /// none are registered.
    pub fn degraded(&self) -> bool {
        !self
            .per_source_status
            .values()
            .any(|s| s.status == SourceState::Ok)
    }
}

pub struct Aggregator {
    config: AggregatorConfig,
    registry: AdapterRegistry,
    ranker: Ranker,
    cache: Arc<ResultCache>,
    affinity: Arc<AffinityStore>,
    query: Arc<QueryUnderstanding>,
    health: SourceHealthTracker,
    topics: FrequencyCounter,
}

impl Aggregator {
    /// Build an aggregator with fresh stores sized from `config`.
    pub fn new(config: &Config, registry: AdapterRegistry) -> Self {
        Self::with_stores(
            config.aggregator.clone(),
            config.ranking.clone(),
            registry,
            Arc::new(ResultCache::new(config.cache.clone())),
            Arc::new(AffinityStore::new(config.affinity.clone())),
            Arc::new(QueryUnderstanding::new(config.query.max_suggestions)),
        )
    }

    pub fn with_stores(
        config: AggregatorConfig,
        ranking: RankingConfig,
        registry: AdapterRegistry,
        cache: Arc<ResultCache>,
        affinity: Arc<AffinityStore>,
        query: Arc<QueryUnderstanding>,
    ) -> Self {
        Self {
            config,
            registry,
            ranker: Ranker::new(ranking),
            cache,
            affinity,
            query,
            health: SourceHealthTracker::new(),
            topics: FrequencyCounter::new(),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn affinity(&self) -> &Arc<AffinityStore> {
        &self.affinity
    }

    pub fn query_understanding(&self) -> &Arc<QueryUnderstanding> {
        &self.query
    }

    /// Run the full pipeline for `query`, personalized when `user_id` is set.
    pub async fn search(
        &self,
        query: SearchQuery,
        user_id: Option<&str>,
    ) -> Result<SearchResult, QueryError> {
        let started = Instant::now();
        query.validate(self.config.max_limit, self.config.max_query_len)?;

        if !query.is_discover() {
            self.query.record_query(&query.text);
        }

        let key = cache_key(&query, user_id);
        if let Some(mut hit) = self.cache.get(&key) {
            hit.cached = true;
            hit.search_latency_ms = elapsed_ms(started);
            return Ok(hit);
        }

        let enhanced = enhance(&query.text);
        let effective = enhanced.apply_to(&query);
        debug!(
            text = %effective.text,
            intent = ?enhanced.intent.intent,
            "Enhanced query."
        );

        let fan_out = self.fan_out(&effective).await;
        let degraded = fan_out.degraded();
        let candidate_count = fan_out.items.len();

        let affinities = user_id.map(|u| self.affinity.affinities(u));
        let ranked = self.ranker.rank(fan_out.items, &effective, affinities.as_ref());
        let page = paginate(ranked, effective.offset, effective.limit);

        for item in &page.items {
            if let Some(topic) = item.dominant_topic() {
                self.topics.record(topic);
            }
        }

        let result = SearchResult {
            items: page.items,
            total_count: page.total_count,
            has_more: page.has_more,
            next_offset: page.next_offset,
            search_latency_ms: elapsed_ms(started),
            per_source_status: fan_out.per_source_status,
            degraded,
            cached: false,
            candidate_count,
            intent: Some(enhanced.intent),
        };

        if degraded {
            warn!(sources = result.per_source_status.len(), "No source succeeded; returning degraded result.");
        } else {
            self.cache.put(&key, &result);
        }

        info!(
            text = %query.text,
            total = result.total_count,
            candidates = candidate_count,
            latency_ms = result.search_latency_ms,
            "Search complete."
        );
        Ok(result)
    }

    /// Discover mode: no text, ranked by engagement, freshness, and the
    /// user's affinities.
    pub async fn discover(
        &self,
        user_id: Option<&str>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<SearchResult, QueryError> {
        let query = SearchQuery {
            limit: limit.unwrap_or(self.config.default_limit),
            offset,
            ..Default::default()
        };
        self.search(query, user_id).await
    }

    /// Query every adapter concurrently under the per-adapter timeouts and
    /// the overall deadline, then merge in registration order.
    pub async fn fan_out(&self, query: &SearchQuery) -> FanOut {
        let adapters = self.registry.adapters();
        let default_timeout = Duration::from_millis(self.config.adapter_timeout_ms);
        let deadline_ms = self.config.deadline_ms;

        let mut set = JoinSet::new();
        for (idx, adapter) in adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let query = query.clone();
            let timeout = adapter.timeout().unwrap_or(default_timeout);
            set.spawn(async move {
                let started = Instant::now();
                let outcome = match tokio::time::timeout(timeout, adapter.fetch(&query)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AdapterError::Timeout {
                        after_ms: timeout.as_millis() as u64,
                    }),
                };
                (idx, outcome, elapsed_ms(started))
            });
        }

        let mut outcomes: Vec<Option<(Result<Vec<ContentItem>, AdapterError>, u64)>> =
            (0..adapters.len()).map(|_| None).collect();
        let mut deadline_hit = false;

        let deadline = tokio::time::sleep(Duration::from_millis(deadline_ms));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok((idx, outcome, latency_ms))) => outcomes[idx] = Some((outcome, latency_ms)),
                    Some(Err(e)) => warn!(error = %e, "Adapter task failed."),
                },
                _ = &mut deadline => {
                    deadline_hit = true;
                    set.abort_all();
                    break;
                }
            }
        }

        let mut seen: HashSet<(Platform, String)> = HashSet::new();
        let mut items = Vec::new();
        let mut per_source_status = BTreeMap::new();

        for (adapter, slot) in adapters.iter().zip(outcomes) {
            let name = adapter.name();
            let (outcome, latency_ms) = slot.unwrap_or_else(|| {
                if deadline_hit {
                    (Err(AdapterError::Timeout { after_ms: deadline_ms }), deadline_ms)
                } else {
                    (Err(AdapterError::Unavailable("adapter task aborted".into())), 0)
                }
            });

            let status = match outcome {
                Ok(fetched) => {
                    self.health.record_success(name, latency_ms);
                    let count = fetched.len();
                    for item in fetched {
                        if seen.insert((item.platform, item.id.clone())) {
                            items.push(item);
                        }
                    }
                    SourceStatus {
                        status: SourceState::Ok,
                        count,
                        error: None,
                        latency_ms,
                    }
                }
                Err(err) => {
                    warn!(adapter = %name, kind = err.kind(), error = %err, latency_ms, "Adapter failed.");
                    self.health.record_failure(name, &err, latency_ms);
                    SourceStatus {
                        status: SourceState::Error,
                        count: 0,
                        error: Some(err.detail()),
                        latency_ms,
                    }
                }
            };
            per_source_status.insert(name.to_string(), status);
        }

        FanOut {
            items,
            per_source_status,
        }
    }

    /// Feed an interaction into the affinity store.
    pub fn record_interaction(&self, interaction: &Interaction) -> f64 {
        self.affinity
            .record_interaction(&interaction.user_id, &interaction.topic_id, interaction.kind)
    }

    pub fn admin_snapshot(&self) -> AdminSnapshot {
        let names: Vec<&str> = self.registry.adapters().iter().map(|a| a.name()).collect();
        AdminSnapshot {
            generated_at: Utc::now(),
            sources: self.health.snapshot(names),
            cache: self.cache.stats(),
            top_queries: self
                .query
                .top_queries(TOP_N)
                .into_iter()
                .map(CountEntry::from)
                .collect(),
            top_topics: self.topics.top(TOP_N).into_iter().map(CountEntry::from).collect(),
            users_tracked: self.affinity.user_count(),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
