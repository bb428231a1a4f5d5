//! OpenAI-compatible v1 API plus relay introspection endpoints

pub mod cache;
pub mod chat;
pub mod providers;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/chat/completions", post(chat::create_chat_completion))
        .route("/providers/status", get(providers::provider_status))
        .route("/cache", delete(cache::clear_cache))
        .route("/cache/stats", get(cache::cache_stats))
        .route("/cache/export", get(cache::export_cache))
        .route("/cache/import", post(cache::import_cache))
        .route("/cache/cleanup", post(cache::cleanup_cache))
}
