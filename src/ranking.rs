//! Ranking engine: filtering, multi-factor scoring, ordering, pagination.
//!
//! # Pipeline
//!
//! ```text
//! merged items ──▶ filter (query.filters) ──▶ score ──▶ sort (sortBy) ──▶ paginate
//! ```
//!
//! Filtering runs before scoring. Every item's [`Scores`] are recomputed on
//! each call; nothing upstream is trusted.
//!
//! # Composite score
//!
//! ```text
//! ai_score = relevance + engagement + freshness + quality + personalized
//! ```
//!
//! - **relevance**: weighted term matches in title, description, and
//!   topics/keywords/tags. Synonym expansions count at `synonym_factor`.
//! - **engagement**: `(likes + comments + shares) / max(views, 1)`, scaled
//!   and capped.
//! - **freshness**: step function of upload age.
//! - **quality**: fixed bonuses for fact-checked, subtitled, and verified.
//! - **personalized**: affinity of the item's dominant topic, scaled.
//!
//! # Ordering
//!
//! Descending primary key for the requested sort mode, then `upload_date`
//! desc, `id` asc, `platform` asc. Given the same items, query, affinities,
//! and clock, the order is identical on every call.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::RankingConfig;
use crate::models::{ContentItem, Scores, SearchFilters, SearchQuery, SortBy};
use crate::query::enhance;

/// Whether `item` passes every filter in `filters`.
pub fn passes_filters(item: &ContentItem, filters: &SearchFilters) -> bool {
    if !filters.platforms.is_empty() && !filters.platforms.contains(&item.platform) {
        return false;
    }
    if !filters.categories.is_empty()
        && !filters
            .categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&item.category))
    {
        return false;
    }
    if let Some(range) = filters.duration_seconds {
        let live_exempt = filters.is_live == Some(true) && item.is_live && item.duration_seconds == 0;
        if !live_exempt {
            if range.min.is_some_and(|min| item.duration_seconds < min) {
                return false;
            }
            if range.max.is_some_and(|max| item.duration_seconds > max) {
                return false;
            }
        }
    }
    if let Some(range) = filters.upload_date {
        if range.from.is_some_and(|from| item.upload_date < from) {
            return false;
        }
        if range.to.is_some_and(|to| item.upload_date > to) {
            return false;
        }
    }
    if let Some(subs) = filters.has_subtitles {
        if item.has_subtitles != subs {
            return false;
        }
    }
    if let Some(live) = filters.is_live {
        if item.is_live != live {
            return false;
        }
    }
    if let Some(min_views) = filters.min_views {
        if item.views < min_views {
            return false;
        }
    }
    true
}

pub fn filter_items(items: Vec<ContentItem>, filters: &SearchFilters) -> Vec<ContentItem> {
    items
        .into_iter()
        .filter(|item| passes_filters(item, filters))
        .collect()
}

/// Lowercased match terms derived from a query's text.
#[derive(Debug, Clone, Default)]
pub struct MatchTerms {
    pub phrase: String,
    pub terms: Vec<String>,
    pub expanded: Vec<String>,
}

impl MatchTerms {
    pub fn from_text(text: &str) -> Self {
        let enhanced = enhance(text);
        Self {
            phrase: enhanced.terms.join(" "),
            terms: enhanced.terms,
            expanded: enhanced.expanded_terms,
        }
    }
}

/// A page cut from a ranked list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<ContentItem>,
    pub total_count: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
}

pub fn paginate(ranked: Vec<ContentItem>, offset: usize, limit: usize) -> Page {
    let total_count = ranked.len();
    let items: Vec<ContentItem> = ranked.into_iter().skip(offset).take(limit).collect();
    let end = offset.saturating_add(items.len());
    let has_more = end < total_count;
    Page {
        items,
        total_count,
        has_more,
        next_offset: if has_more { Some(end) } else { None },
    }
}

pub struct Ranker {
    weights: RankingConfig,
}

impl Ranker {
    pub fn new(weights: RankingConfig) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RankingConfig {
        &self.weights
    }

    /// Filter, score, and order `items` for `query`.
    pub fn rank(
        &self,
        items: Vec<ContentItem>,
        query: &SearchQuery,
        affinities: Option<&HashMap<String, f64>>,
    ) -> Vec<ContentItem> {
        self.rank_at(items, query, affinities, Utc::now())
    }

    pub fn rank_at(
        &self,
        items: Vec<ContentItem>,
        query: &SearchQuery,
        affinities: Option<&HashMap<String, f64>>,
        now: DateTime<Utc>,
    ) -> Vec<ContentItem> {
        let terms = MatchTerms::from_text(&query.text);
        let mut ranked = filter_items(items, &query.filters);
        for item in &mut ranked {
            item.scores = self.score_item(item, &terms, affinities, now);
        }
        sort_items(&mut ranked, query.sort_by());
        ranked
    }

    pub fn score_item(
        &self,
        item: &ContentItem,
        terms: &MatchTerms,
        affinities: Option<&HashMap<String, f64>>,
        now: DateTime<Utc>,
    ) -> Scores {
        let relevance = self.relevance(item, terms);
        let engagement = self.engagement(item);
        let freshness = self.freshness(item, now);
        let quality = self.quality(item);
        let personalized = match (affinities, item.dominant_topic()) {
            (Some(map), Some(topic)) => map.get(topic).copied().unwrap_or(0.0) * self.weights.affinity_scale,
            _ => 0.0,
        };

        Scores {
            relevance,
            engagement,
            freshness,
            quality,
            personalized,
            ai_score: relevance + engagement + freshness + quality + personalized,
        }
    }

    fn relevance(&self, item: &ContentItem, terms: &MatchTerms) -> f64 {
        if terms.terms.is_empty() {
            return 0.0;
        }
        let w = &self.weights;
        let title = item.title.to_lowercase();
        let description = item.description.to_lowercase();
        let in_labels = |term: &str| {
            item.topics.iter().any(|t| t.contains(term))
                || item.keywords.iter().any(|k| k.contains(term))
                || item.tags.iter().any(|t| t.contains(term))
        };

        let mut score = 0.0;
        if title.contains(&terms.phrase) {
            score += w.title_match;
        }
        if description.contains(&terms.phrase) {
            score += w.description_match;
        }

        for (list, factor) in [(&terms.terms, 1.0), (&terms.expanded, w.synonym_factor)] {
            for term in list.iter() {
                if title.contains(term.as_str()) {
                    score += w.title_term * factor;
                }
                if description.contains(term.as_str()) {
                    score += w.description_term * factor;
                }
                if in_labels(term) {
                    score += w.topic_match * factor;
                }
            }
        }
        score
    }

    fn engagement(&self, item: &ContentItem) -> f64 {
        let interactions = item
            .likes
            .saturating_add(item.comments)
            .saturating_add(item.shares) as f64;
        let ratio = interactions / item.views.max(1) as f64;
        (ratio * self.weights.engagement_scale).min(self.weights.engagement_cap)
    }

    fn freshness(&self, item: &ContentItem, now: DateTime<Utc>) -> f64 {
        let age = (now - item.upload_date).max(chrono::Duration::zero());
        let w = &self.weights;
        if age < chrono::Duration::days(1) {
            w.fresh_day
        } else if age < chrono::Duration::days(7) {
            w.fresh_week
        } else if age < chrono::Duration::days(w.freshness_cutoff_days) {
            w.fresh_month
        } else {
            0.0
        }
    }

    fn quality(&self, item: &ContentItem) -> f64 {
        let w = &self.weights;
        let mut q = 0.0;
        if item.fact_checked {
            q += w.fact_checked_bonus;
        }
        if item.has_subtitles {
            q += w.subtitles_bonus;
        }
        if item.author.verified {
            q += w.verified_bonus;
        }
        q
    }
}

/// Order scored items for `sort_by`, with the fixed tie-break chain.
pub fn sort_items(items: &mut [ContentItem], sort_by: SortBy) {
    items.sort_by(|a, b| {
        primary_order(a, b, sort_by)
            .then(b.upload_date.cmp(&a.upload_date))
            .then(a.id.cmp(&b.id))
            .then(a.platform.cmp(&b.platform))
    });
}

fn primary_order(a: &ContentItem, b: &ContentItem, sort_by: SortBy) -> Ordering {
    let desc = |x: f64, y: f64| y.partial_cmp(&x).unwrap_or(Ordering::Equal);
    match sort_by {
        SortBy::Relevance => desc(a.scores.ai_score, b.scores.ai_score),
        SortBy::Date => b.upload_date.cmp(&a.upload_date),
        SortBy::Views => b.views.cmp(&a.views),
        SortBy::Engagement => desc(a.scores.engagement, b.scores.engagement),
        SortBy::Trending => desc(
            a.scores.engagement + a.scores.freshness,
            b.scores.engagement + b.scores.freshness,
        ),
    }
}
