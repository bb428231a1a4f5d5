//! Sequential fallback execution with per-provider retry and linear backoff

use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::confidence::score_confidence;
use super::health::HealthProber;
use crate::domain::error::{ProviderError, ProviderFailure};
use crate::domain::llm::{ChatRequest, ChatResponse};
use crate::domain::provider::ProviderHandle;
use crate::domain::DomainError;

/// Tries candidates strictly in order; never races providers
#[derive(Debug, Clone)]
pub struct FallbackExecutor {
    prober: HealthProber,
}

impl FallbackExecutor {
    pub fn new(prober: HealthProber) -> Self {
        Self { prober }
    }

    pub fn prober(&self) -> &HealthProber {
        &self.prober
    }

    /// Probe, then run the fallback chain for `request`.
    ///
    /// `response_time_ms` on the result spans the whole call: probing, failed
    /// attempts and backoff included.
    #[instrument(skip(self, request), fields(messages = request.messages.len()))]
    pub async fn execute(&self, request: &ChatRequest) -> Result<ChatResponse, DomainError> {
        let started = Instant::now();
        let candidates = self.prober.candidates().await;
        self.run_chain(&candidates, request, started).await
    }

    /// Run the fallback chain over an explicit candidate list
    pub async fn execute_with(
        &self,
        candidates: &[ProviderHandle],
        request: &ChatRequest,
    ) -> Result<ChatResponse, DomainError> {
        self.run_chain(candidates, request, Instant::now()).await
    }

    async fn run_chain(
        &self,
        candidates: &[ProviderHandle],
        request: &ChatRequest,
        started: Instant,
    ) -> Result<ChatResponse, DomainError> {
        let mut failures = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match self.try_provider(candidate, request, started).await {
                Ok(response) => return Ok(response),
                Err(failure) => failures.push(failure),
            }
        }

        warn!(attempted = failures.len(), "All providers failed");
        Err(DomainError::all_providers_failed(failures))
    }

    async fn try_provider(
        &self,
        candidate: &ProviderHandle,
        request: &ChatRequest,
        request_started: Instant,
    ) -> Result<ChatResponse, ProviderFailure> {
        let config = &candidate.config;
        let mut last_error = ProviderError::transient("no attempt made");
        let mut attempts = 0;

        for attempt in 1..=config.max_retries {
            attempts = attempt;
            let attempt_started = Instant::now();

            let result = match tokio::time::timeout(config.timeout(), candidate.client.complete(request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(format!(
                    "request timed out after {}ms",
                    config.timeout_ms
                ))),
            };

            let elapsed = attempt_started.elapsed();
            let status = if result.is_ok() { "success" } else { "error" };

            counter!(
                "llm_provider_attempts_total",
                "provider" => config.id.clone(),
                "status" => status
            )
            .increment(1);
            histogram!(
                "llm_request_duration_seconds",
                "provider" => config.id.clone(),
                "status" => status
            )
            .record(elapsed.as_secs_f64());

            match result {
                Ok(response) => {
                    let confidence = score_confidence(&response.content, &config.name);
                    let total_ms = u64::try_from(request_started.elapsed().as_millis())
                        .unwrap_or(u64::MAX);

                    info!(
                        provider = %config.id,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        total_ms,
                        confidence,
                        "Provider completed request"
                    );

                    return Ok(response
                        .with_provider(config.name.clone())
                        .with_response_time_ms(total_ms)
                        .with_confidence(confidence));
                }
                Err(error) => {
                    warn!(
                        provider = %config.id,
                        attempt,
                        max_retries = config.max_retries,
                        kind = %error.kind,
                        error = %error.message,
                        "Provider attempt failed"
                    );

                    let retryable = error.is_retryable();
                    last_error = error;

                    if !retryable {
                        debug!(provider = %config.id, "Non-retryable failure, moving to next provider");
                        break;
                    }

                    if attempt < config.max_retries {
                        tokio::time::sleep(config.backoff_for_attempt(attempt)).await;
                    }
                }
            }
        }

        Err(ProviderFailure::new(config.name.clone(), attempts, &last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use crate::domain::llm::{MockProviderAdapter, ProviderAdapter, ScriptedAdapter};
    use crate::domain::provider::{ProviderConfig, ProviderRegistry};
    use std::sync::Arc;
    use std::time::Duration;

    fn executor(registry: ProviderRegistry) -> FallbackExecutor {
        FallbackExecutor::new(HealthProber::new(Arc::new(registry)))
    }

    fn request() -> ChatRequest {
        ChatRequest::builder().user("What is your pricing?").build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_next_provider() {
        let a = Arc::new(ScriptedAdapter::failing(ProviderError::transient("503")));
        let b = Arc::new(ScriptedAdapter::new("Custom quotes via consultation"));

        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("a", "A", 9).with_max_retries(3),
                Some(a.clone() as Arc<dyn ProviderAdapter>),
            )
            .unwrap()
            .with_provider(
                ProviderConfig::new("b", "B", 5),
                Some(b.clone() as Arc<dyn ProviderAdapter>),
            )
            .unwrap();

        let response = executor(registry).execute(&request()).await.unwrap();

        assert_eq!(response.provider, "B");
        assert_eq!(response.content, "Custom quotes via consultation");
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 1);
        assert!((0.0..=1.0).contains(&response.confidence));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_provider_called_exactly_max_retries() {
        let mut mock = MockProviderAdapter::new();
        mock.expect_health_check().returning(|| true);
        mock.expect_complete()
            .times(4)
            .returning(|_| Err(ProviderError::transient("rate limited")));

        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("flaky", "Flaky", 9).with_max_retries(4),
                Some(Arc::new(mock)),
            )
            .unwrap();

        let error = executor(registry).execute(&request()).await.unwrap_err();

        match error {
            DomainError::AllProvidersFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].attempts, 4);
                assert_eq!(failures[0].kind, ErrorKind::Transient);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_linearly() {
        let adapter = Arc::new(
            ScriptedAdapter::new("done").with_failures(2, ProviderError::transient("503")),
        );
        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("p", "P", 1)
                    .with_max_retries(3)
                    .with_backoff_unit_ms(1000),
                Some(adapter.clone() as Arc<dyn ProviderAdapter>),
            )
            .unwrap();

        let started = tokio::time::Instant::now();
        let response = executor(registry).execute(&request()).await.unwrap();

        assert_eq!(response.content, "done");
        // 1000ms after attempt 1, 2000ms after attempt 2
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert!(started.elapsed() < Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_time_spans_health_round_and_retries() {
        let adapter = Arc::new(
            ScriptedAdapter::new("done")
                .with_failures(1, ProviderError::transient("503"))
                .with_health_delay(Duration::from_millis(200)),
        );
        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("p", "P", 1)
                    .with_max_retries(2)
                    .with_backoff_unit_ms(1000),
                Some(adapter as Arc<dyn ProviderAdapter>),
            )
            .unwrap();

        let response = executor(registry).execute(&request()).await.unwrap();

        // 200ms health round, then 1000ms backoff before the winning attempt
        assert!(response.response_time_ms >= 1200);
        assert!(response.response_time_ms < 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sleep_after_final_attempt() {
        let adapter = Arc::new(ScriptedAdapter::failing(ProviderError::transient("503")));
        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("p", "P", 1)
                    .with_max_retries(2)
                    .with_backoff_unit_ms(1000),
                Some(adapter as Arc<dyn ProviderAdapter>),
            )
            .unwrap();

        let started = tokio::time::Instant::now();
        let _ = executor(registry).execute(&request()).await;

        assert!(started.elapsed() < Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_skips_remaining_retries() {
        let a = Arc::new(ScriptedAdapter::failing(ProviderError::fatal("HTTP 401: bad key")));
        let b = Arc::new(ScriptedAdapter::new("answer"));

        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("a", "A", 9).with_max_retries(3),
                Some(a.clone() as Arc<dyn ProviderAdapter>),
            )
            .unwrap()
            .with_provider(ProviderConfig::new("b", "B", 5), Some(b as Arc<dyn ProviderAdapter>))
            .unwrap();

        let response = executor(registry).execute(&request()).await.unwrap();

        assert_eq!(response.provider, "B");
        assert_eq!(a.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let slow = Arc::new(ScriptedAdapter::new("late").with_complete_delay(Duration::from_secs(10)));
        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("slow", "Slow", 1)
                    .with_max_retries(1)
                    .with_timeout_ms(100),
                Some(slow as Arc<dyn ProviderAdapter>),
            )
            .unwrap();

        let error = executor(registry).execute(&request()).await.unwrap_err();

        match error {
            DomainError::AllProvidersFailed { failures } => {
                assert_eq!(failures[0].kind, ErrorKind::Timeout);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_providers_are_still_attempted() {
        let adapter = Arc::new(ScriptedAdapter::new("still works").with_health(false));
        let registry = ProviderRegistry::new()
            .with_provider(
                ProviderConfig::new("p", "OpenAI", 1),
                Some(adapter as Arc<dyn ProviderAdapter>),
            )
            .unwrap();

        let response = executor(registry).execute(&request()).await.unwrap();
        assert_eq!(response.provider, "OpenAI");
    }

    #[tokio::test]
    async fn test_empty_registry_fails() {
        let error = executor(ProviderRegistry::new())
            .execute(&request())
            .await
            .unwrap_err();

        assert!(error.is_all_providers_failed());
    }
}
