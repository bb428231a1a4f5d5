//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;
use crate::domain::ProbeStatus;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Returns 200 while the process is up
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Probes every provider; degraded (still 200) when none is healthy, since
/// cached answers and the fallback responder keep serving
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let mut checks = Vec::new();

    let outcomes = state.prober().probe_all().await;
    let any_healthy = outcomes.iter().any(|o| o.status == ProbeStatus::Healthy);

    for outcome in outcomes {
        let status = match outcome.status {
            ProbeStatus::Healthy => HealthStatus::Healthy,
            _ => HealthStatus::Unhealthy,
        };

        checks.push(HealthCheck {
            name: format!("provider:{}", outcome.id),
            status,
            message: (status != HealthStatus::Healthy).then(|| outcome.status.as_str().to_string()),
            latency_ms: outcome.latency_ms,
        });
    }

    let cache_check = check_cache(&state).await;
    let cache_ok = cache_check.status == HealthStatus::Healthy;
    checks.push(cache_check);

    let overall_status = match (any_healthy, cache_ok) {
        (true, true) => HealthStatus::Healthy,
        (_, false) => HealthStatus::Unhealthy,
        (false, true) => HealthStatus::Degraded,
    };

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn check_cache(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    match state.cache().len().await {
        Ok(size) => HealthCheck {
            name: "semantic_cache".to_string(),
            status: HealthStatus::Healthy,
            message: Some(format!("{} entries", size)),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => HealthCheck {
            name: "semantic_cache".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
    }
}
