//! `[observability]` settings: OTLP span export and the Prometheus route

use serde::Deserialize;

use crate::domain::DomainError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    /// Reject values that would break the router or the sampler at startup
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.metrics.path.starts_with('/') {
            return Err(DomainError::configuration(format!(
                "observability.metrics.path must start with '/', got {:?}",
                self.metrics.path
            )));
        }

        if !(0.0..=1.0).contains(&self.tracing.sampling_ratio) {
            return Err(DomainError::configuration(
                "observability.tracing.sampling_ratio must be within [0, 1]",
            ));
        }

        Ok(())
    }
}

/// OTLP export stays off unless `enabled`; console logging is configured separately
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    /// gRPC collector, e.g. `http://localhost:4317`
    pub otlp_endpoint: String,
    pub service_name: String,
    pub sampling_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "llm-relay".to_string(),
            sampling_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Route serving the Prometheus text exposition
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}
