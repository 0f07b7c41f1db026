//! # Civic Discovery
//!
//! Content aggregation, ranking, and personalization for civic news and
//! video.
//!
//! Given a free-text query plus structured filters (or just a user with no
//! query), the engine fans out to several unreliable upstream sources at
//! once, merges and deduplicates what comes back, ranks it with a blend of
//! relevance, engagement, freshness, quality, and learned per-user topic
//! affinity, and caches the final page.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─────────────────────┐
//!  query ───────▶ │ Query Understanding │  enhance / suggest / intent
//!                 └──────────┬──────────┘
//!                            ▼
//! ┌──────────┐    ┌─────────────────────┐    ┌─────────────────┐
//! │  Result  │◀──▶│     Aggregator      │───▶│ Source Adapters │
//! │  Cache   │    │ fan-out + deadline  │◀───│ fixture/catalog │
//! └──────────┘    └──────────┬──────────┘    │ /http           │
//!                            ▼               └─────────────────┘
//!                 ┌─────────────────────┐    ┌─────────────────┐
//!                 │   Ranking Engine    │◀───│ Affinity Store  │
//!                 └──────────┬──────────┘    └─────────────────┘
//!                            ▼
//!                ┌──────────────────────┐
//!                │  CLI (civic) / HTTP  │
//!                └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! civic sources                          # check configured adapters
//! civic search "congress live"           # live congressional coverage
//! civic discover --user u-42             # personalized feed
//! civic serve                            # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Adapter and query error types |
//! | [`models`] | Core data types |
//! | [`lexicon`] | Synonyms, topics, popular queries, filter keywords |
//! | [`normalize`] | Duration, thumbnail, keyword, and topic helpers |
//! | [`traits`] | `SourceAdapter` trait and registry |
//! | [`adapter_fixture`] | JSON fixture adapter |
//! | [`adapter_catalog`] | SQLite catalog adapter |
//! | [`adapter_http`] | HTTP video and live-stream adapter |
//! | [`query`] | Query enhancement, suggestions, intent |
//! | [`ranking`] | Filtering, scoring, ordering, pagination |
//! | [`affinity`] | Decaying per-user topic affinities |
//! | [`cache`] | TTL result cache |
//! | [`aggregator`] | Concurrent fan-out and pipeline |
//! | [`stats`] | Source health and admin snapshot |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Catalog schema |

pub mod adapter_catalog;
pub mod adapter_fixture;
pub mod adapter_http;
pub mod affinity;
pub mod aggregator;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod lexicon;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod query;
pub mod ranking;
pub mod search;
pub mod server;
pub mod sources;
pub mod stats;
pub mod traits;
