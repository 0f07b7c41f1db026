//! HTTP JSON API.
//!
//! Exposes search, discovery, suggestions, interactions, and admin stats
//! over a small axum server. Every handler delegates to one shared
//! [`Aggregator`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/search` | Search request → ranked `SearchResult` |
//! | `GET`  | `/discover` | Discover feed (`user_id`, `limit`, `offset`) |
//! | `GET`  | `/suggest` | Typed completions for `q` |
//! | `POST` | `/enhance` | Synonym expansion, inferred filters, intent |
//! | `POST` | `/interactions` | Record an interaction (fire-and-forget, `202`) |
//! | `GET`  | `/users/{id}/affinities` | Decayed topic weights for a user |
//! | `GET`  | `/sources` | Registered adapters |
//! | `GET`  | `/sources/{name}` | One adapter, or `404` |
//! | `GET`  | `/admin/stats` | Source health, cache stats, top queries/topics |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "limit must be between 1 and 100, got 0" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::error::QueryError;
use crate::models::{Interaction, SearchRequest, SearchResult};
use crate::query::{enhance, EnhancedQuery, Suggestion};
use crate::stats::AdminSnapshot;
use crate::traits::{AdapterInfo, AdapterRegistry};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    aggregator: Arc<Aggregator>,
}

/// Starts the HTTP server with adapters built from `config`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let registry = AdapterRegistry::from_config(config)?;
    run_server_with_adapters(config, registry).await
}

/// Starts the server with a caller-supplied adapter registry.
///
/// # Example
///
/// ```rust,no_run
/// use civic_discovery::server::run_server_with_adapters;
/// use civic_discovery::traits::AdapterRegistry;
///
/// # async fn example(config: &civic_discovery::config::Config) -> anyhow::Result<()> {
/// let mut adapters = AdapterRegistry::from_config(config)?;
/// // adapters.register(std::sync::Arc::new(MyAdapter::new()))?;
/// run_server_with_adapters(config, adapters).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_adapters(
    config: &Config,
    registry: AdapterRegistry,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    for info in registry.infos() {
        info!(adapter = %info.name, kind = %info.adapter_type, platform = %info.platform, "Registered adapter.");
    }

    let aggregator = Arc::new(Aggregator::new(config, registry));
    spawn_cache_sweeper(Arc::clone(&aggregator), config.cache.ttl_secs);

    let app = router(aggregator);

    println!("Civic discovery server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router around `aggregator`.
pub fn router(aggregator: Arc<Aggregator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/discover", get(handle_discover))
        .route("/suggest", get(handle_suggest))
        .route("/enhance", post(handle_enhance))
        .route("/interactions", post(handle_interaction))
        .route("/users/{id}/affinities", get(handle_affinities))
        .route("/sources", get(handle_sources))
        .route("/sources/{name}", get(handle_source))
        .route("/admin/stats", get(handle_admin_stats))
        .layer(cors)
        .with_state(AppState { aggregator })
}

/// Evict expired cache entries every `ttl_secs / 2`.
fn spawn_cache_sweeper(aggregator: Arc<Aggregator>, ttl_secs: u64) {
    let period = Duration::from_secs((ttl_secs / 2).max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = aggregator.cache().evict_expired();
            if removed > 0 {
                debug!(removed, "Swept expired cache entries.");
            }
        }
    });
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        bad_request(err.to_string())
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /search ============

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResult>, AppError> {
    let result = state
        .aggregator
        .search(req.query, req.user_id.as_deref())
        .await?;
    Ok(Json(result))
}

// ============ GET /discover ============

#[derive(Deserialize)]
struct DiscoverParams {
    user_id: Option<String>,
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}

async fn handle_discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<SearchResult>, AppError> {
    let result = state
        .aggregator
        .discover(params.user_id.as_deref(), params.limit, params.offset)
        .await?;
    Ok(Json(result))
}

// ============ GET /suggest ============

#[derive(Deserialize)]
struct SuggestParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct SuggestResponse {
    suggestions: Vec<Suggestion>,
}

async fn handle_suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Json<SuggestResponse> {
    Json(SuggestResponse {
        suggestions: state.aggregator.query_understanding().suggest(&params.q),
    })
}

// ============ POST /enhance ============

#[derive(Deserialize)]
struct EnhanceRequest {
    query: String,
}

async fn handle_enhance(Json(req): Json<EnhanceRequest>) -> Json<EnhancedQuery> {
    Json(enhance(&req.query))
}

// ============ POST /interactions ============

#[derive(Serialize)]
struct AcceptedResponse {
    accepted: bool,
}

/// Validates the event, then applies it on a spawned task so the caller
/// never waits on the affinity store.
async fn handle_interaction(
    State(state): State<AppState>,
    Json(event): Json<Interaction>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    if event.user_id.trim().is_empty() {
        return Err(bad_request("userId must not be empty"));
    }
    if event.topic_id.trim().is_empty() {
        return Err(bad_request("topicId must not be empty"));
    }

    let aggregator = Arc::clone(&state.aggregator);
    tokio::spawn(async move {
        aggregator.record_interaction(&event);
    });

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}

// ============ GET /users/{id}/affinities ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AffinitiesResponse {
    user_id: String,
    affinities: BTreeMap<String, f64>,
}

async fn handle_affinities(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<AffinitiesResponse> {
    let affinities = state.aggregator.affinity().affinities(&id).into_iter().collect();
    Json(AffinitiesResponse {
        user_id: id,
        affinities,
    })
}

// ============ GET /sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<AdapterInfo>,
}

async fn handle_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: state.aggregator.registry().infos(),
    })
}

async fn handle_source(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AdapterInfo>, AppError> {
    state
        .aggregator
        .registry()
        .infos()
        .into_iter()
        .find(|info| info.name == name)
        .map(Json)
        .ok_or_else(|| not_found(format!("no adapter registered with name: {}", name)))
}

// ============ GET /admin/stats ============

async fn handle_admin_stats(State(state): State<AppState>) -> Json<AdminSnapshot> {
    Json(state.aggregator.admin_snapshot())
}
