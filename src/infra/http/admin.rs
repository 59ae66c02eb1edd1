use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{RawQuery, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::application::error::HttpError;
use crate::cache::{AggregateStats, LayeredCache, QueryParams, Resolution, resolve};

use super::middleware::log_responses;

const SOURCE_INVALIDATE: &str = "infra::http::admin::invalidate_cache";

#[derive(Clone)]
pub struct AdminState {
    pub cache: Arc<LayeredCache>,
}

/// Body of `POST /cache/invalidate`; an empty body means every article listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InvalidateRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationScope {
    Articles,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub scope: InvalidationScope,
    pub removed: u64,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health", get(health))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/stats/reset", post(reset_stats))
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/cache/resolve", get(resolve_query))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn cache_stats(State(state): State<AdminState>) -> Json<AggregateStats> {
    Json(state.cache.aggregate_stats())
}

async fn reset_stats(State(state): State<AdminState>) -> Response {
    state.cache.reset_all_stats();
    StatusCode::NO_CONTENT.into_response()
}

async fn invalidate_cache(
    State(state): State<AdminState>,
    body: Bytes,
) -> Result<Json<InvalidateResponse>, HttpError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        InvalidateRequest::default()
    } else {
        serde_json::from_slice::<InvalidateRequest>(&body).map_err(|err| {
            HttpError::from_error(
                SOURCE_INVALIDATE,
                StatusCode::BAD_REQUEST,
                "Invalid request body",
                &err,
            )
        })?
    };

    let user_id = request
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let response = match user_id {
        Some(user_id) => InvalidateResponse {
            scope: InvalidationScope::User,
            removed: state.cache.invalidate_user(user_id).await,
        },
        None => InvalidateResponse {
            scope: InvalidationScope::Articles,
            removed: state.cache.invalidate_articles().await,
        },
    };

    Ok(Json(response))
}

async fn resolve_query(RawQuery(query): RawQuery) -> Json<Resolution> {
    let params = QueryParams::from_query_str(query.as_deref().unwrap_or_default());
    Json(resolve(&params))
}
