//! Query understanding: enhancement, intent classification, suggestions.
//!
//! [`enhance`] and [`classify_intent`] are pure functions of their input and
//! the static tables in [`lexicon`](crate::lexicon), with no network access
//! and no randomness. [`QueryUnderstanding::suggest`] additionally consults
//! a frequency counter of previously observed queries.

use serde::Serialize;

use crate::lexicon::{
    self, EXPLORE_TOKENS, FILTER_NAMES, LIVE_TOKENS, LONG_MIN_SECONDS, LONG_TOKENS,
    POPULAR_QUERIES, POPULAR_TOKENS, RECENT_TOKENS, SHORT_MAX_SECONDS, SHORT_TOKENS,
    SUBTITLE_TOKENS, TOPIC_CATALOG, TRENDING_TOKENS,
};
use crate::models::{
    DurationRange, IntentGuess, Platform, SearchFilters, SearchIntent, SearchQuery, SortBy,
};
use crate::normalize::{query_terms, tokenize};
use crate::stats::FrequencyCounter;

/// A raw query after synonym expansion and filter inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedQuery {
    pub original: String,
    /// Relevance terms, with filter-trigger tokens removed.
    pub terms: Vec<String>,
    /// Synonym expansions not already present in `terms`.
    pub expanded_terms: Vec<String>,
    /// Filters inferred from the text. Only set fields are meaningful.
    pub inferred_filters: SearchFilters,
    pub intent: IntentGuess,
}

impl EnhancedQuery {
    /// Text sent to adapters: the relevance terms joined by spaces.
    pub fn search_text(&self) -> String {
        self.terms.join(" ")
    }

    /// Apply the enhancement to `query`: replace its text with the search
    /// text and fill inferred filters the caller left unset.
    pub fn apply_to(&self, query: &SearchQuery) -> SearchQuery {
        let mut out = query.clone();
        out.text = self.search_text();

        let inferred = &self.inferred_filters;
        let f = &mut out.filters;
        if f.platforms.is_empty() {
            f.platforms = inferred.platforms.clone();
        }
        if f.duration_seconds.is_none() {
            f.duration_seconds = inferred.duration_seconds;
        }
        if f.has_subtitles.is_none() {
            f.has_subtitles = inferred.has_subtitles;
        }
        if f.is_live.is_none() {
            f.is_live = inferred.is_live;
        }
        if f.sort_by.is_none() {
            f.sort_by = inferred.sort_by;
        }
        out
    }
}

/// Expand `raw` with synonyms and infer filters from embedded keywords.
pub fn enhance(raw: &str) -> EnhancedQuery {
    let tokens = query_terms(raw);
    let mut filters = SearchFilters::default();
    let mut terms: Vec<String> = Vec::new();

    for token in &tokens {
        let t = token.as_str();
        if LIVE_TOKENS.contains(&t) {
            filters.is_live = Some(true);
        } else if RECENT_TOKENS.contains(&t) {
            filters.sort_by = Some(SortBy::Date);
        } else if TRENDING_TOKENS.contains(&t) {
            filters.sort_by = Some(SortBy::Trending);
        } else if POPULAR_TOKENS.contains(&t) {
            if filters.sort_by.is_none() {
                filters.sort_by = Some(SortBy::Views);
            }
        } else if SHORT_TOKENS.contains(&t) {
            filters.duration_seconds = Some(DurationRange {
                min: None,
                max: Some(SHORT_MAX_SECONDS),
            });
        } else if LONG_TOKENS.contains(&t) {
            filters.duration_seconds = Some(DurationRange {
                min: Some(LONG_MIN_SECONDS),
                max: None,
            });
        } else if SUBTITLE_TOKENS.contains(&t) {
            filters.has_subtitles = Some(true);
        } else if let Some(platform) = platform_token(t) {
            if !filters.platforms.contains(&platform) {
                filters.platforms.push(platform);
            }
        } else {
            terms.push(token.clone());
        }
    }

    let expanded_terms = expand_synonyms(&terms);

    EnhancedQuery {
        original: raw.to_string(),
        terms,
        expanded_terms,
        inferred_filters: filters,
        intent: classify_intent(raw),
    }
}

fn platform_token(token: &str) -> Option<Platform> {
    match token.parse::<Platform>() {
        Ok(Platform::Catalog) | Err(_) => None,
        Ok(p) => Some(p),
    }
}

fn expand_synonyms(terms: &[String]) -> Vec<String> {
    let joined = format!(" {} ", terms.join(" "));
    let mut expanded: Vec<String> = Vec::new();

    for (key, expansions) in lexicon::SYNONYMS {
        let present = if key.contains(' ') {
            joined.contains(&format!(" {} ", key))
        } else {
            terms.iter().any(|t| t == key)
        };
        if !present {
            continue;
        }
        for e in expansions.iter() {
            let e = e.to_string();
            if !terms.contains(&e) && !expanded.contains(&e) {
                expanded.push(e);
            }
        }
    }

    expanded
}

/// Rule-based, advisory intent classification.
pub fn classify_intent(raw: &str) -> IntentGuess {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return IntentGuess {
            intent: SearchIntent::Discover,
            confidence: 1.0,
        };
    }

    let tokens = tokenize(trimmed);
    let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));

    if has(TRENDING_TOKENS) {
        return IntentGuess {
            intent: SearchIntent::Trending,
            confidence: 0.9,
        };
    }

    let quoted = trimmed.matches('"').count() >= 2;
    let handle = trimmed.split_whitespace().any(|w| w.starts_with('@') && w.len() > 1);
    let term_count = query_terms(trimmed).len();
    if quoted || handle || term_count >= 5 {
        return IntentGuess {
            intent: SearchIntent::Specific,
            confidence: 0.8,
        };
    }

    if has(EXPLORE_TOKENS) {
        return IntentGuess {
            intent: SearchIntent::Discover,
            confidence: 0.7,
        };
    }

    IntentGuess {
        intent: SearchIntent::Search,
        confidence: if term_count <= 1 { 0.5 } else { 0.6 },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Query,
    Filter,
    Topic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub score: f64,
}

/// Stateful half of query understanding: observed-query tracking and
/// suggestions.
pub struct QueryUnderstanding {
    observed: FrequencyCounter,
    max_suggestions: usize,
}

impl QueryUnderstanding {
    pub fn new(max_suggestions: usize) -> Self {
        Self {
            observed: FrequencyCounter::new(),
            max_suggestions,
        }
    }

    /// Count a submitted query for suggestions and trending stats.
    pub fn record_query(&self, raw: &str) {
        let normalized = normalize_query(raw);
        if !normalized.is_empty() {
            self.observed.record(&normalized);
        }
    }

    pub fn top_queries(&self, n: usize) -> Vec<(String, u64)> {
        self.observed.top(n)
    }

    /// Ranked, typed completions for a partial query.
    pub fn suggest(&self, partial: &str) -> Vec<Suggestion> {
        let p = normalize_query(partial);
        let mut out: Vec<Suggestion> = Vec::new();

        if p.is_empty() {
            for (text, count) in self.observed.top(self.max_suggestions) {
                push(&mut out, text, SuggestionKind::Query, 2.0 + (count as f64).ln());
            }
            for q in POPULAR_QUERIES {
                push(&mut out, q.to_string(), SuggestionKind::Query, 1.0);
            }
            return finish(out, self.max_suggestions);
        }

        // Previously observed queries, by frequency
        for (text, count) in self.observed.with_prefix(&p) {
            if text != p {
                push(&mut out, text, SuggestionKind::Query, 3.0 + (1.0 + count as f64).ln());
            }
        }

        // Static popular queries
        for q in POPULAR_QUERIES {
            if q.starts_with(p.as_str()) && *q != p {
                push(&mut out, q.to_string(), SuggestionKind::Query, 2.5);
            } else if q.split(' ').any(|w| w.starts_with(p.as_str())) && *q != p {
                push(&mut out, q.to_string(), SuggestionKind::Query, 1.5);
            }
        }

        // Topic catalog
        for topic in TOPIC_CATALOG {
            let label = topic.label.to_lowercase();
            if label.starts_with(p.as_str()) || topic.id.starts_with(p.as_str()) {
                push(&mut out, topic.label.to_string(), SuggestionKind::Topic, 2.0);
            } else if label.contains(p.as_str()) {
                push(&mut out, topic.label.to_string(), SuggestionKind::Topic, 1.0);
            }
        }

        // Filter names, completing the last word typed
        if let Some(last) = p.split(' ').next_back() {
            for name in FILTER_NAMES {
                if name.starts_with(last) && *name != last {
                    push(&mut out, name.to_string(), SuggestionKind::Filter, 1.2);
                }
            }
        }

        finish(out, self.max_suggestions)
    }
}

fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn push(out: &mut Vec<Suggestion>, text: String, kind: SuggestionKind, score: f64) {
    if let Some(existing) = out.iter_mut().find(|s| s.text == text) {
        if score > existing.score {
            existing.score = score;
            existing.kind = kind;
        }
        return;
    }
    out.push(Suggestion { text, kind, score });
}

fn finish(mut out: Vec<Suggestion>, cap: usize) -> Vec<Suggestion> {
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.text.cmp(&b.text))
    });
    out.truncate(cap);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_infers_live_and_strips_trigger() {
        let e = enhance("congress live");
        assert_eq!(e.terms, vec!["congress"]);
        assert_eq!(e.inferred_filters.is_live, Some(true));
        assert!(e.expanded_terms.contains(&"senate".to_string()));
        assert_eq!(e.search_text(), "congress");
    }

    #[test]
    fn test_enhance_is_deterministic() {
        assert_eq!(enhance("Newest UK election coverage"), enhance("Newest UK election coverage"));
    }

    #[test]
    fn test_enhance_country_expansion() {
        let e = enhance("india elections");
        for expected in ["indian", "delhi", "mumbai", "vote", "ballot"] {
            assert!(e.expanded_terms.contains(&expected.to_string()), "missing {}", expected);
        }
        let e = enhance("united states economy");
        assert!(e.expanded_terms.contains(&"american".to_string()));
    }

    #[test]
    fn test_enhance_sort_and_duration_filters() {
        let e = enhance("recent senate hearing");
        assert_eq!(e.inferred_filters.sort_by, Some(SortBy::Date));
        let e = enhance("viral short clips");
        assert_eq!(e.inferred_filters.sort_by, Some(SortBy::Trending));
        assert_eq!(
            e.inferred_filters.duration_seconds,
            Some(DurationRange { min: None, max: Some(SHORT_MAX_SECONDS) })
        );
        let e = enhance("hearing with captions on youtube");
        assert_eq!(e.inferred_filters.has_subtitles, Some(true));
        assert_eq!(e.inferred_filters.platforms, vec![Platform::Youtube]);
        assert_eq!(e.terms, vec!["hearing"]);
    }

    #[test]
    fn test_apply_to_does_not_override_explicit_filters() {
        let mut q = SearchQuery::new("congress live");
        q.filters.is_live = Some(false);
        let applied = enhance(&q.text).apply_to(&q);
        assert_eq!(applied.filters.is_live, Some(false));
        assert_eq!(applied.text, "congress");
    }

    #[test]
    fn test_classify_intent_rules() {
        assert_eq!(classify_intent("").intent, SearchIntent::Discover);
        assert_eq!(classify_intent("   ").confidence, 1.0);
        assert_eq!(classify_intent("viral debate clip").intent, SearchIntent::Trending);
        assert_eq!(classify_intent("\"state of the union\"").intent, SearchIntent::Specific);
        assert_eq!(classify_intent("@cspan senate").intent, SearchIntent::Specific);
        assert_eq!(
            classify_intent("senate budget hearing water rights oversight").intent,
            SearchIntent::Specific
        );
        assert_eq!(classify_intent("explore climate").intent, SearchIntent::Discover);
        let guess = classify_intent("congress");
        assert_eq!(guess.intent, SearchIntent::Search);
        assert_eq!(guess.confidence, 0.5);
        assert_eq!(classify_intent("senate hearing").confidence, 0.6);
    }

    #[test]
    fn test_suggest_mixes_kinds_and_caps() {
        let qu = QueryUnderstanding::new(8);
        let s = qu.suggest("c");
        assert!(s.len() <= 8);
        assert!(s.iter().any(|x| x.kind == SuggestionKind::Query && x.text == "congress hearing"));
        assert!(s.iter().any(|x| x.kind == SuggestionKind::Topic && x.text == "Climate"));
    }

    #[test]
    fn test_suggest_ranks_observed_queries_first() {
        let qu = QueryUnderstanding::new(6);
        qu.record_query("congress budget vote");
        qu.record_query("Congress  budget vote");
        qu.record_query("congress recess");
        let s = qu.suggest("congr");
        assert_eq!(s[0].text, "congress budget vote");
        assert_eq!(s[1].text, "congress recess");
        assert_eq!(qu.top_queries(1), vec![("congress budget vote".to_string(), 2)]);
    }

    #[test]
    fn test_suggest_filter_names() {
        let qu = QueryUnderstanding::new(8);
        let s = qu.suggest("senate li");
        assert!(s.iter().any(|x| x.kind == SuggestionKind::Filter && x.text == "live"));
    }

    #[test]
    fn test_suggest_empty_partial_returns_popular() {
        let qu = QueryUnderstanding::new(3);
        let s = qu.suggest("");
        assert_eq!(s.len(), 3);
        assert!(s.iter().all(|x| x.kind == SuggestionKind::Query));
    }
}
