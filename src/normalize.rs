//! Provider-agnostic normalization helpers.
//!
//! Adapters map upstream payloads into [`ContentItem`](crate::models::ContentItem)s
//! with these helpers so every source parses durations, picks thumbnails,
//! and derives keywords/topics the same way.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};

use crate::lexicon::{is_stopword, synonyms_for, TOPIC_CATALOG};
use crate::models::ContentItem;

/// A candidate thumbnail rendition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Parse an upstream duration into seconds.
///
/// Accepts ISO-8601 (`PT1H2M3S`, `P1DT2H`), clock style (`1:02:03`, `4:05`),
/// and plain seconds (`125`). Returns `None` for anything else.
pub fn parse_duration(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(rest) = s.strip_prefix('P').or_else(|| s.strip_prefix('p')) {
        return parse_iso8601_duration(rest);
    }
    if s.contains(':') {
        let mut total = 0u64;
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() > 3 {
            return None;
        }
        for part in parts {
            let n: u64 = part.parse().ok()?;
            total = total * 60 + n;
        }
        return Some(total);
    }
    s.parse().ok()
}

fn parse_iso8601_duration(rest: &str) -> Option<u64> {
    let mut total = 0u64;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for ch in rest.chars() {
        match ch.to_ascii_uppercase() {
            'T' => {
                if !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            c if c.is_ascii_digit() => number.push(c),
            unit => {
                let n: u64 = number.parse().ok()?;
                number.clear();
                let secs = match (unit, in_time) {
                    ('W', false) => n * 7 * 86_400,
                    ('D', false) => n * 86_400,
                    ('H', true) => n * 3_600,
                    ('M', true) => n * 60,
                    ('S', true) => n,
                    _ => return None,
                };
                total += secs;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }
    Some(total)
}

/// Pick the highest-resolution thumbnail. The first one wins ties.
pub fn best_thumbnail(thumbnails: &[Thumbnail]) -> Option<&Thumbnail> {
    let mut best: Option<&Thumbnail> = None;
    for t in thumbnails {
        let area = u64::from(t.width) * u64::from(t.height);
        match best {
            Some(b) if u64::from(b.width) * u64::from(b.height) >= area => {}
            _ => best = Some(t),
        }
    }
    best
}

/// Shortest token kept as a query term or keyword.
pub const MIN_TERM_LEN: usize = 3;

/// Lowercase word tokens (alphanumeric runs).
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Most frequent non-stopword tokens of at least three characters.
///
/// Ordered by frequency (desc), then alphabetically, truncated to `max`.
pub fn extract_keywords(text: &str, max: usize) -> BTreeSet<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokenize(text) {
        if token.chars().count() < MIN_TERM_LEN || is_stopword(&token) || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(max).map(|(w, _)| w).collect()
}

/// Topic ids from the topic catalog whose keywords appear in `text`.
///
/// Single-word keywords match whole tokens; multi-word keywords match as
/// phrases. Results follow catalog order.
pub fn infer_topics(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let token_set: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
    let joined = format!(" {} ", tokens.join(" "));

    TOPIC_CATALOG
        .iter()
        .filter(|topic| {
            topic.keywords.iter().any(|kw| {
                if kw.contains(' ') {
                    joined.contains(&format!(" {} ", kw))
                } else {
                    token_set.contains(kw)
                }
            })
        })
        .map(|topic| topic.id.to_string())
        .collect()
}

/// Lowercased text an item can be matched against: title, description,
/// category, tags, topics, keywords, and author name.
pub fn search_haystack(item: &ContentItem) -> String {
    let mut parts: Vec<&str> = vec![
        item.title.as_str(),
        item.description.as_str(),
        item.category.as_str(),
        item.author.name.as_str(),
    ];
    parts.extend(item.tags.iter().map(String::as_str));
    parts.extend(item.topics.iter().map(String::as_str));
    parts.extend(item.keywords.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

/// Non-stopword query terms, in order of first appearance.
///
/// Tokens shorter than [`MIN_TERM_LEN`] are dropped since adapters match by
/// substring; short synonym keys such as "uk" are kept.
pub fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in tokenize(text) {
        let short = token.chars().count() < MIN_TERM_LEN && synonyms_for(&token).is_empty();
        if !short && !is_stopword(&token) && !terms.contains(&token) {
            terms.push(token);
        }
    }
    terms
}

/// Lowercase, trimmed, deduplicated tag set.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
