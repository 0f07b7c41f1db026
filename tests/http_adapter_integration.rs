//! `HttpAdapter` against a local axum stub standing in for a provider.
//!
//! Covers payload mapping over the wire and every failure mapping:
//! 429, 5xx, client timeout, missing credentials, and undecodable bodies.

use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use civic_discovery::adapter_http::HttpAdapter;
use civic_discovery::config::{HttpAdapterConfig, HttpAdapterKind};
use civic_discovery::models::{Platform, SearchQuery};
use civic_discovery::traits::SourceAdapter;

// ─── Stub provider ──────────────────────────────────────────────────

async fn videos(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let q = params.get("q").cloned().unwrap_or_default();
    Json(json!({
        "items": [{
            "id": "v1",
            "title": format!("Hearing results for {}", q),
            "published_at": "2024-05-01T10:00:00Z",
            "duration": "PT1H2M3S",
            "statistics": { "views": 100, "likes": 7 },
            "channel": { "id": "c1", "name": "Chamber", "verified": true },
            "thumbnails": [
                { "url": "small", "width": 120, "height": 90 },
                { "url": "large", "width": 1280, "height": 720 }
            ],
            "captions": true
        }]
    }))
}

async fn streams() -> impl IntoResponse {
    Json(json!({
        "streams": [{
            "id": "s1",
            "user_name": "council",
            "title": "Council meeting live",
            "viewer_count": 42,
            "started_at": "2024-05-01T18:00:00Z",
            "thumbnail_url": "https://img.example/{width}x{height}.jpg"
        }]
    }))
}

async fn limited() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn down() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance")
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "items": [] }))
}

async fn garbage() -> impl IntoResponse {
    "<html>not json</html>"
}

async fn secure(headers: HeaderMap) -> impl IntoResponse {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "Bearer council-token")
        .unwrap_or(false);
    if authorized {
        (StatusCode::OK, Json(json!({ "items": [] })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })))
    }
}

async fn start_stub() -> String {
    let app = Router::new()
        .route("/videos", get(videos))
        .route("/streams", get(streams))
        .route("/limited", get(limited))
        .route("/down", get(down))
        .route("/slow", get(slow))
        .route("/garbage", get(garbage))
        .route("/secure", get(secure));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

fn adapter(base: &str, path: &str, kind: HttpAdapterKind) -> HttpAdapter {
    HttpAdapter::new(
        "stub".to_string(),
        HttpAdapterConfig {
            platform: Platform::Vimeo,
            kind,
            base_url: format!("{}{}", base, path),
            api_key_env: None,
            timeout_secs: 1,
            max_results: 25,
        },
    )
    .unwrap()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_video_payload_over_http() {
    let base = start_stub().await;
    let items = adapter(&base, "/videos", HttpAdapterKind::Video)
        .fetch(&SearchQuery::new("zoning"))
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    let v = &items[0];
    assert_eq!(v.id, "v1");
    assert_eq!(v.platform, Platform::Vimeo);
    assert_eq!(v.title, "Hearing results for zoning");
    assert_eq!(v.duration_seconds, 3723);
    assert_eq!(v.views, 100);
    assert!(v.has_subtitles);
    assert!(v.author.verified);
    assert_eq!(v.thumbnail_url.as_deref(), Some("large"));
}

#[tokio::test]
async fn test_live_payload_over_http() {
    let base = start_stub().await;
    let items = adapter(&base, "/streams", HttpAdapterKind::Live)
        .fetch(&SearchQuery::new("council"))
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert!(items[0].is_live);
    assert_eq!(items[0].views, 42);
    assert_eq!(
        items[0].thumbnail_url.as_deref(),
        Some("https://img.example/1920x1080.jpg")
    );
}

#[tokio::test]
async fn test_429_is_rate_limited() {
    let base = start_stub().await;
    let err = adapter(&base, "/limited", HttpAdapterKind::Video)
        .fetch(&SearchQuery::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "rate_limited");
}

#[tokio::test]
async fn test_5xx_is_unavailable() {
    let base = start_stub().await;
    let err = adapter(&base, "/down", HttpAdapterKind::Video)
        .fetch(&SearchQuery::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unavailable");
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let base = start_stub().await;
    let started = Instant::now();
    let err = adapter(&base, "/slow", HttpAdapterKind::Video)
        .fetch(&SearchQuery::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "timeout");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let base = start_stub().await;
    let err = adapter(&base, "/garbage", HttpAdapterKind::Video)
        .fetch(&SearchQuery::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "malformed_response");
}

#[tokio::test]
async fn test_connection_refused_is_unavailable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = adapter(&format!("http://127.0.0.1:{}", port), "/videos", HttpAdapterKind::Video)
        .fetch(&SearchQuery::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unavailable");
}

#[tokio::test]
async fn test_missing_api_key_env_is_unavailable() {
    let base = start_stub().await;
    let mut cfg = HttpAdapterConfig {
        platform: Platform::Vimeo,
        kind: HttpAdapterKind::Video,
        base_url: format!("{}/secure", base),
        api_key_env: Some("CIVIC_HTTP_TEST_KEY_NEVER_SET".to_string()),
        timeout_secs: 1,
        max_results: 25,
    };
    let err = HttpAdapter::new("stub".into(), cfg.clone())
        .unwrap()
        .fetch(&SearchQuery::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unavailable");
    assert!(err.to_string().contains("CIVIC_HTTP_TEST_KEY_NEVER_SET"));

    std::env::set_var("CIVIC_HTTP_TEST_KEY_SET", "council-token");
    cfg.api_key_env = Some("CIVIC_HTTP_TEST_KEY_SET".to_string());
    let items = HttpAdapter::new("stub".into(), cfg)
        .unwrap()
        .fetch(&SearchQuery::new("x"))
        .await
        .unwrap();
    assert!(items.is_empty());
}
