//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;

const MAX_PATH_LABEL_LEN: usize = 50;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder; `None` when disabled or already installed
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("llm_relay_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Router serving the scrape endpoint at `path`
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// How a chat request was ultimately answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Provider,
    Cached,
    Fallback,
    Failed,
}

impl ChatOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "success",
            Self::Cached => "cached",
            Self::Fallback => "fallback",
            Self::Failed => "error",
        }
    }
}

/// Parameters for gateway-level chat metrics
#[derive(Debug)]
pub struct ChatMetricParams<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    pub outcome: ChatOutcome,
    pub tokens: Option<u32>,
}

/// Record one answered (or failed) chat request
pub fn record_llm_request(params: ChatMetricParams) {
    let labels = [
        ("provider", params.provider.to_string()),
        ("model", params.model.to_string()),
        ("status", params.outcome.as_str().to_string()),
    ];

    counter!("llm_requests_total", &labels).increment(1);

    if let Some(tokens) = params.tokens {
        counter!("llm_tokens_total", &labels).increment(u64::from(tokens));
    }
}

/// Drop the query string and cap label length
fn sanitize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    path.chars().take(MAX_PATH_LABEL_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_strips_query() {
        assert_eq!(sanitize_path("/v1/cache/stats?verbose=1"), "/v1/cache/stats");
    }

    #[test]
    fn test_sanitize_path_no_query() {
        assert_eq!(sanitize_path("/health"), "/health");
    }

    #[test]
    fn test_sanitize_path_truncates_long_paths() {
        let path = "/very/long/path/that/exceeds/the/maximum/allowed/length/for/metrics";
        assert_eq!(sanitize_path(path).len(), MAX_PATH_LABEL_LEN);
    }

    #[test]
    fn test_chat_outcome_labels() {
        assert_eq!(ChatOutcome::Provider.as_str(), "success");
        assert_eq!(ChatOutcome::Cached.as_str(), "cached");
        assert_eq!(ChatOutcome::Fallback.as_str(), "fallback");
        assert_eq!(ChatOutcome::Failed.as_str(), "error");
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig {
            enabled: false,
            path: "/metrics".to_string(),
        };

        assert!(init_metrics(&config).is_none());
    }
}
