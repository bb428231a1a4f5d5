//! Provider health introspection

use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::types::Json;
use crate::domain::ProbeOutcome;

#[derive(Debug, Serialize)]
pub struct ProviderStatusResponse {
    /// One entry per registered provider, in registration order
    pub providers: Vec<ProbeOutcome>,
    /// Ids of healthy providers in the order requests will try them
    pub healthy_order: Vec<String>,
}

/// GET /v1/providers/status
pub async fn provider_status(State(state): State<AppState>) -> Json<ProviderStatusResponse> {
    let providers = state.prober().probe_all().await;
    let healthy_order = state
        .prober()
        .rank_healthy(&providers)
        .iter()
        .map(|handle| handle.id().to_string())
        .collect();

    Json(ProviderStatusResponse {
        providers,
        healthy_order,
    })
}
