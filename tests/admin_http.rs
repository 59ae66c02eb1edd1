use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::Value;
use techtrend::cache::{CacheConfig, LayeredCache, MemoryBackend, QueryParams};
use techtrend::infra::http::{
    AdminState, InvalidateResponse, InvalidationScope, build_admin_router,
};
use tower::ServiceExt;

fn setup() -> (Router, Arc<LayeredCache>) {
    let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(64).expect("capacity")));
    let cache = Arc::new(LayeredCache::new(CacheConfig::default(), backend));
    let router = build_admin_router(AdminState {
        cache: Arc::clone(&cache),
    });
    (router, cache)
}

async fn send(router: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .expect("request should build");
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn stats_endpoint_exposes_dashboard_shape() {
    let (router, cache) = setup();
    let params = QueryParams::new().with("page", 1);
    for _ in 0..2 {
        cache
            .fetch(&params, || async { Ok::<_, String>(1_u8) })
            .await
            .expect("fetch");
    }

    let (status, body) = send(&router, Method::GET, "/cache/stats", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).expect("stats json");
    assert_eq!(json["perTier"]["public"]["hits"], 1);
    assert_eq!(json["perTier"]["public"]["misses"], 1);
    assert_eq!(json["perTier"]["public"]["sets"], 1);
    assert_eq!(json["perTier"]["public"]["hitRate"], 0.5);
    assert_eq!(json["perTier"]["userScoped"]["hits"], 0);
    assert_eq!(json["perTier"]["search"]["hitRate"], 0.0);
    assert_eq!(json["overall"]["totalHits"], 1);
    assert_eq!(json["overall"]["totalMisses"], 1);
    assert_eq!(json["overall"]["overallHitRate"], 0.5);
}

#[tokio::test]
async fn reset_endpoint_zeroes_counters() {
    let (router, cache) = setup();
    let _ = cache.lookup::<u8>(&QueryParams::new().with("search", "rust")).await;
    assert_eq!(cache.aggregate_stats().overall.total_misses, 1);

    let (status, body) = send(&router, Method::POST, "/cache/stats/reset", Body::empty()).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert_eq!(cache.aggregate_stats().overall.total_misses, 0);
}

#[tokio::test]
async fn invalidate_without_body_clears_article_listings() {
    let (router, cache) = setup();
    let public = QueryParams::new().with("page", 2);
    let user = QueryParams::new()
        .with("userId", "u1")
        .with("readFilter", "read");
    cache.store(&public, "public").await.expect("store");
    cache.store(&user, "user").await.expect("store");

    let (status, body) = send(&router, Method::POST, "/cache/invalidate", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    let response: InvalidateResponse = serde_json::from_slice(&body).expect("response json");
    assert_eq!(response.scope, InvalidationScope::Articles);
    assert_eq!(response.removed, 2);
    assert_eq!(cache.lookup::<String>(&public).await, None);
}

#[tokio::test]
async fn invalidate_with_user_id_is_user_scoped() {
    let (router, cache) = setup();
    let public = QueryParams::new().with("page", 1);
    let user = QueryParams::new()
        .with("userId", "u1")
        .with("readFilter", "unread");
    cache.store(&public, "public").await.expect("store");
    cache.store(&user, "user").await.expect("store");

    let (status, body) = send(
        &router,
        Method::POST,
        "/cache/invalidate",
        Body::from(r#"{"userId":"u1"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: InvalidateResponse = serde_json::from_slice(&body).expect("response json");
    assert_eq!(response.scope, InvalidationScope::User);
    assert_eq!(response.removed, 1);
    assert_eq!(cache.lookup::<String>(&user).await, None);
    assert_eq!(cache.lookup::<String>(&public).await.as_deref(), Some("public"));
}

#[tokio::test]
async fn invalidate_rejects_malformed_body() {
    let (router, _cache) = setup();

    let (status, _) = send(
        &router,
        Method::POST,
        "/cache/invalidate",
        Body::from(r#"{"user": 7}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resolve_endpoint_reports_routing() {
    let (router, _cache) = setup();

    let (status, body) = send(
        &router,
        Method::GET,
        "/cache/resolve?tag=react&page=1",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).expect("resolution json");
    assert_eq!(json["tier"], "uncacheable");
    assert_eq!(json["key"], Value::Null);

    let (_, body) = send(
        &router,
        Method::GET,
        "/cache/resolve?search=foo%20bar",
        Body::empty(),
    )
    .await;
    let json: Value = serde_json::from_slice(&body).expect("resolution json");
    assert_eq!(json["tier"], "search");
    assert_eq!(
        json["key"],
        "search:category:all|limit:20|page:1|search:bar,foo|sortBy:publishedAt|sortOrder:desc|sources:all"
    );
}

#[tokio::test]
async fn health_returns_no_content() {
    let (router, _cache) = setup();
    let (status, _) = send(&router, Method::GET, "/_health", Body::empty()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
