//! Concurrent provider health probing

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::provider::{ProviderHandle, ProviderRegistry};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
    TimedOut,
    NoClient,
}

impl ProbeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::TimedOut => "timed_out",
            Self::NoClient => "no_client",
        }
    }
}

/// Per-provider probe report, in registration order
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub has_client: bool,
    pub status: ProbeStatus,
    pub latency_ms: Option<u64>,
}

/// Runs every provider's probe on each call; nothing is remembered between calls
#[derive(Debug, Clone)]
pub struct HealthProber {
    registry: Arc<ProviderRegistry>,
    probe_timeout: Duration,
}

impl HealthProber {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Probe all registered providers concurrently and wait for every probe
    pub async fn probe_all(&self) -> Vec<ProbeOutcome> {
        let entries = self.registry.entries();
        let mut outcomes: Vec<Option<ProbeOutcome>> = vec![None; entries.len()];
        let mut probes = JoinSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let config = entry.config();

            let Some(handle) = entry.handle() else {
                outcomes[index] = Some(ProbeOutcome {
                    id: config.id.clone(),
                    name: config.name.clone(),
                    priority: config.priority,
                    has_client: false,
                    status: ProbeStatus::NoClient,
                    latency_ms: None,
                });
                continue;
            };

            let probe_timeout = self.probe_timeout;
            probes.spawn(async move {
                let started = Instant::now();
                let status =
                    match tokio::time::timeout(probe_timeout, handle.client.health_check()).await {
                        Ok(true) => ProbeStatus::Healthy,
                        Ok(false) => ProbeStatus::Unhealthy,
                        Err(_) => ProbeStatus::TimedOut,
                    };

                (index, status, started.elapsed().as_millis() as u64)
            });
        }

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((index, status, latency_ms)) => {
                    let config = entries[index].config();

                    counter!(
                        "provider_health_checks_total",
                        "provider" => config.id.clone(),
                        "status" => status.as_str()
                    )
                    .increment(1);

                    debug!(
                        provider = %config.id,
                        status = status.as_str(),
                        latency_ms,
                        "Health probe finished"
                    );

                    outcomes[index] = Some(ProbeOutcome {
                        id: config.id.clone(),
                        name: config.name.clone(),
                        priority: config.priority,
                        has_client: true,
                        status,
                        latency_ms: Some(latency_ms),
                    });
                }
                Err(e) => warn!(error = %e, "Health probe task failed"),
            }
        }

        // A probe task that panicked leaves its slot empty
        outcomes
            .into_iter()
            .zip(entries)
            .map(|(outcome, entry)| {
                outcome.unwrap_or_else(|| {
                    let config = entry.config();
                    ProbeOutcome {
                        id: config.id.clone(),
                        name: config.name.clone(),
                        priority: config.priority,
                        has_client: entry.has_client(),
                        status: ProbeStatus::Unhealthy,
                        latency_ms: None,
                    }
                })
            })
            .collect()
    }

    /// Providers with a client and a passing probe, by descending priority
    pub async fn healthy_providers(&self) -> Vec<ProviderHandle> {
        let outcomes = self.probe_all().await;
        self.rank_healthy(&outcomes)
    }

    /// Order an existing probe report without probing again
    pub fn rank_healthy(&self, outcomes: &[ProbeOutcome]) -> Vec<ProviderHandle> {
        Self::healthy_from(&self.registry, outcomes)
    }

    /// Healthy providers first, then every other provider with a client in registration order
    pub async fn candidates(&self) -> Vec<ProviderHandle> {
        let mut candidates = self.healthy_providers().await;

        for handle in self.registry.available() {
            if !candidates.iter().any(|c| c.id() == handle.id()) {
                candidates.push(handle);
            }
        }

        candidates
    }

    fn healthy_from(registry: &ProviderRegistry, outcomes: &[ProbeOutcome]) -> Vec<ProviderHandle> {
        let mut healthy: Vec<(usize, ProviderHandle)> = registry
            .entries()
            .iter()
            .zip(outcomes)
            .enumerate()
            .filter(|(_, (_, outcome))| outcome.status == ProbeStatus::Healthy)
            .filter_map(|(index, (entry, _))| entry.handle().map(|h| (index, h)))
            .collect();

        healthy.sort_by_key(|(index, handle)| (Reverse(handle.priority()), *index));
        healthy.into_iter().map(|(_, handle)| handle).collect()
    }
}
