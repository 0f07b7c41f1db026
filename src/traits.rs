//! Source adapter contract and registry.
//!
//! Every upstream provider is reached through a [`SourceAdapter`]. The rest
//! of the system depends only on this trait, so a deterministic fixture
//! adapter can stand in for a real provider in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │             AdapterRegistry              │
//! │  ┌─────────┐ ┌─────────┐ ┌────────────┐  │
//! │  │ Fixture │ │ Catalog │ │    HTTP    │  │
//! │  │ (JSON)  │ │ (SQLite)│ │ video/live │  │
//! │  └─────────┘ └─────────┘ └────────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!        Aggregator::search() fan-out
//! ```
//!
//! # Usage
//!
//! ```rust
//! use civic_discovery::traits::AdapterRegistry;
//!
//! let mut adapters = AdapterRegistry::new();
//! // adapters.register(std::sync::Arc::new(MyAdapter::new()))?;
//! assert!(adapters.is_empty());
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AdapterError;
use crate::models::{ContentItem, Platform, SearchQuery};

/// A provider integration that fetches candidate items for a query.
///
/// # Contract
///
/// - [`fetch`](SourceAdapter::fetch) never panics on upstream failure; it
///   returns a typed [`AdapterError`] instead.
/// - Implementations apply their own request timeout. The aggregator
///   additionally bounds every call by [`timeout`](SourceAdapter::timeout)
///   and by the overall request deadline.
/// - Returned items carry zeroed [`Scores`](crate::models::Scores); the
///   ranking engine computes them.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use civic_discovery::error::AdapterError;
/// use civic_discovery::models::{ContentItem, Platform, SearchQuery};
/// use civic_discovery::traits::SourceAdapter;
///
/// pub struct EmptyAdapter;
///
/// #[async_trait]
/// impl SourceAdapter for EmptyAdapter {
///     fn name(&self) -> &str { "empty" }
///     fn platform(&self) -> Platform { Platform::Catalog }
///     fn description(&self) -> &str { "Always returns nothing" }
///
///     async fn fetch(&self, _query: &SearchQuery) -> Result<Vec<ContentItem>, AdapterError> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Instance name, unique within a registry. Keys `perSourceStatus`.
    fn name(&self) -> &str;

    /// Platform the adapter's items belong to.
    fn platform(&self) -> Platform;

    /// One-line description, shown by `civic sources`.
    fn description(&self) -> &str;

    /// Adapter type identifier (`"fixture"`, `"catalog"`, `"http"`, `"custom"`).
    fn adapter_type(&self) -> &str {
        "custom"
    }

    /// Per-call timeout. `None` defers to `aggregator.adapter_timeout_ms`.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Fetch and normalize candidate items for `query`.
    ///
    /// Discover requests arrive with empty `query.text`; adapters should
    /// return their browse or trending feed for those.
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<ContentItem>, AdapterError>;
}

/// Registry entry summary, for `civic sources` and `GET /sources`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInfo {
    pub name: String,
    pub adapter_type: String,
    pub platform: Platform,
    pub description: String,
}

/// Ordered set of registered adapters.
///
/// Registration order is significant: when two adapters return the same
/// `(platform, id)`, the earlier-registered adapter's copy is kept.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty adapter registry.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Create a registry pre-loaded with every adapter declared in the config.
    ///
    /// Fixture adapters come first, then catalog, then HTTP; within each type
    /// instances are ordered by name.
    pub fn from_config(config: &Config) -> Result<Self> {
        use crate::adapter_catalog::CatalogAdapter;
        use crate::adapter_fixture::FixtureAdapter;
        use crate::adapter_http::HttpAdapter;

        let mut registry = Self::new();

        for (name, cfg) in &config.adapters.fixture {
            registry.register(Arc::new(FixtureAdapter::from_file(name.clone(), cfg)?))?;
        }
        for (name, cfg) in &config.adapters.catalog {
            registry.register(Arc::new(CatalogAdapter::new(name.clone(), cfg.clone())))?;
        }
        for (name, cfg) in &config.adapters.http {
            registry.register(Arc::new(HttpAdapter::new(name.clone(), cfg.clone())?))?;
        }

        Ok(registry)
    }

    /// Register an adapter. Later registrations lose dedup ties.
    ///
    /// Fails if an adapter with the same name is already registered.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> Result<()> {
        if self.find(adapter.name()).is_some() {
            anyhow::bail!("adapter name '{}' is already registered", adapter.name());
        }
        self.adapters.push(adapter);
        Ok(())
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    /// Find an adapter by instance name.
    pub fn find(&self, name: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    pub fn infos(&self) -> Vec<AdapterInfo> {
        self.adapters
            .iter()
            .map(|a| AdapterInfo {
                name: a.name().to_string(),
                adapter_type: a.adapter_type().to_string(),
                platform: a.platform(),
                description: a.description().to_string(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
