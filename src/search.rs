//! CLI front end for search, discover, suggest, and enhance.
//!
//! Each command builds a one-shot [`Aggregator`] from the config, runs the
//! request, and prints either a human-readable listing or the raw JSON
//! result (`--json`).

use anyhow::{Context, Result};
use chrono::Utc;

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::models::{SearchQuery, SearchResult, SourceState};
use crate::query::{enhance, QueryUnderstanding};
use crate::traits::AdapterRegistry;

pub async fn run_search(
    config: &Config,
    query: SearchQuery,
    user_id: Option<&str>,
    json: bool,
) -> Result<()> {
    let registry = AdapterRegistry::from_config(config)?;
    if registry.is_empty() {
        println!("No adapters configured. Add [adapters.*] sections to the config.");
        return Ok(());
    }

    let aggregator = Aggregator::new(config, registry);
    let result = aggregator
        .search(query, user_id)
        .await
        .context("invalid search query")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

pub async fn run_discover(
    config: &Config,
    user_id: Option<&str>,
    limit: Option<usize>,
    offset: usize,
    json: bool,
) -> Result<()> {
    let query = SearchQuery {
        limit: limit.unwrap_or(config.aggregator.default_limit),
        offset,
        ..Default::default()
    };
    run_search(config, query, user_id, json).await
}

pub fn run_suggest(config: &Config, partial: &str) -> Result<()> {
    let suggestions = QueryUnderstanding::new(config.query.max_suggestions).suggest(partial);
    if suggestions.is_empty() {
        println!("No suggestions.");
        return Ok(());
    }
    println!("{:<36} {:<8} SCORE", "SUGGESTION", "TYPE");
    for s in &suggestions {
        let kind = serde_json::to_value(s.kind)?;
        println!(
            "{:<36} {:<8} {:.2}",
            s.text,
            kind.as_str().unwrap_or_default(),
            s.score
        );
    }
    Ok(())
}

pub fn run_enhance(text: &str) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&enhance(text))?);
    Ok(())
}

/// Print a result page as a numbered listing followed by per-source status.
pub fn print_result(result: &SearchResult) {
    if result.degraded {
        println!("All sources failed; no results available.");
    } else if result.items.is_empty() {
        println!("No results.");
    }

    let now = Utc::now();
    let first = result.next_offset.map(|n| n - result.items.len()).unwrap_or_else(|| {
        result.total_count.saturating_sub(result.items.len())
    });

    for (i, item) in result.items.iter().enumerate() {
        let live = if item.is_live { " LIVE" } else { "" };
        println!(
            "{}. [{:.2}] {} / {}{}",
            first + i + 1,
            item.scores.ai_score,
            item.platform,
            item.title,
            live
        );
        let age_days = (now - item.upload_date).num_days();
        println!(
            "    uploaded: {} ({} day{} ago)",
            item.upload_date.format("%Y-%m-%d"),
            age_days,
            if age_days == 1 { "" } else { "s" }
        );
        println!(
            "    views: {}  likes: {}  comments: {}",
            item.views, item.likes, item.comments
        );
        if let Some(topic) = item.dominant_topic() {
            println!("    topic: {}", topic);
        }
        if let Some(ref url) = item.url {
            println!("    url: {}", url);
        }
        println!("    id: {}", item.id);
        println!();
    }

    println!(
        "Showing {} of {} (candidates: {}, {} ms{})",
        result.items.len(),
        result.total_count,
        result.candidate_count,
        result.search_latency_ms,
        if result.cached { ", cached" } else { "" }
    );
    if let Some(next) = result.next_offset {
        println!("More results: --offset {}", next);
    }

    println!();
    println!("{:<20} {:<6} {:>6} {:>8}   ERROR", "SOURCE", "STATUS", "ITEMS", "MS");
    for (name, status) in &result.per_source_status {
        let state = match status.status {
            SourceState::Ok => "ok",
            SourceState::Error => "error",
        };
        let error = status
            .error
            .as_ref()
            .map(|e| format!("{}: {}", e.kind, e.message))
            .unwrap_or_default();
        println!(
            "{:<20} {:<6} {:>6} {:>8}   {}",
            name, state, status.count, status.latency_ms, error
        );
    }
}
