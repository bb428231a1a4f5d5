//! Semantic cache administration

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::SemanticCacheStats;

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    #[serde(flatten)]
    pub stats: SemanticCacheStats,
    pub hit_rate: f32,
}

#[derive(Debug, Serialize)]
pub struct CacheCountResponse {
    pub count: usize,
}

/// GET /v1/cache/stats
pub async fn cache_stats(
    State(state): State<AppState>,
) -> Result<Json<CacheStatsResponse>, ApiError> {
    let stats = state.cache().stats().await?;
    let hit_rate = stats.hit_rate();

    Ok(Json(CacheStatsResponse { stats, hit_rate }))
}

/// GET /v1/cache/export
pub async fn export_cache(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.cache().export().await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// POST /v1/cache/import; the body is a previous export
pub async fn import_cache(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<CacheCountResponse>, ApiError> {
    let count = state.cache().import(&body).await?;
    info!(count, "Imported semantic cache entries");

    Ok(Json(CacheCountResponse { count }))
}

/// POST /v1/cache/cleanup
pub async fn cleanup_cache(
    State(state): State<AppState>,
) -> Result<Json<CacheCountResponse>, ApiError> {
    let count = state.cache().cleanup_expired().await?;

    Ok(Json(CacheCountResponse { count }))
}

/// DELETE /v1/cache
pub async fn clear_cache(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.cache().clear().await?;
    info!("Semantic cache cleared");

    Ok(StatusCode::NO_CONTENT)
}
