//! Chat gateway: semantic cache in front of the provider fallback chain
//!
//! The cache is consulted with the last user message. A confident hit is
//! served without calling any provider; otherwise the executor answers and
//! the result is cached with its token count and estimated cost. When every
//! provider fails the configured fallback responder, if any, takes over.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::domain::usage::estimate_cost;
use crate::domain::{
    CacheHit, ChatRequest, ChatResponse, ChatStream, DomainError, EntryOptions, FallbackExecutor,
    FallbackResponder, HealthProber, SemanticCache, StreamChunk, StreamingMultiplexer,
};
use crate::infrastructure::observability::{record_llm_request, ChatMetricParams, ChatOutcome};

pub const FALLBACK_MODEL: &str = "fallback";
pub const FALLBACK_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct ChatGatewayService {
    prober: HealthProber,
    executor: FallbackExecutor,
    multiplexer: StreamingMultiplexer,
    cache: Arc<dyn SemanticCache>,
    fallback: Option<Arc<dyn FallbackResponder>>,
    min_confidence_for_reuse: f32,
}

impl ChatGatewayService {
    pub fn new(
        prober: HealthProber,
        cache: Arc<dyn SemanticCache>,
        min_confidence_for_reuse: f32,
    ) -> Self {
        Self {
            executor: FallbackExecutor::new(prober.clone()),
            multiplexer: StreamingMultiplexer::new(prober.clone()),
            prober,
            cache,
            fallback: None,
            min_confidence_for_reuse,
        }
    }

    pub fn with_fallback(mut self, responder: Arc<dyn FallbackResponder>) -> Self {
        self.fallback = Some(responder);
        self
    }

    pub fn prober(&self) -> &HealthProber {
        &self.prober
    }

    pub fn cache(&self) -> &Arc<dyn SemanticCache> {
        &self.cache
    }

    /// Answer `request` from cache, providers, or the fallback responder
    #[instrument(skip(self, request), fields(messages = request.messages.len()))]
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, DomainError> {
        request.validate()?;
        let started = Instant::now();
        let query = request.last_user_message();

        if let Some(query) = query {
            if let Some(hit) = self.reusable_hit(query).await {
                let response = cached_response(hit, started);
                record_llm_request(ChatMetricParams {
                    provider: &response.provider,
                    model: &response.model,
                    outcome: ChatOutcome::Cached,
                    tokens: None,
                });
                return Ok(response);
            }
        }

        match self.executor.execute(request).await {
            Ok(response) => {
                if let Some(query) = query {
                    self.remember(query, &response).await;
                }

                record_llm_request(ChatMetricParams {
                    provider: &response.provider,
                    model: &response.model,
                    outcome: ChatOutcome::Provider,
                    tokens: response.tokens_used,
                });
                Ok(response)
            }
            Err(error) if error.is_all_providers_failed() => {
                match self.fallback_response(request, error, started).await {
                    Ok(response) => {
                        record_llm_request(ChatMetricParams {
                            provider: &response.provider,
                            model: &response.model,
                            outcome: ChatOutcome::Fallback,
                            tokens: None,
                        });
                        Ok(response)
                    }
                    Err(error) => {
                        record_failure(request);
                        Err(error)
                    }
                }
            }
            Err(error) => {
                record_failure(request);
                Err(error)
            }
        }
    }

    /// Stream `request` through the providers; a chain-wide failure becomes
    /// one terminal chunk carrying the fallback text when a responder is set
    pub async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream, DomainError> {
        request.validate()?;

        let stream = self.multiplexer.stream(request.clone()).await;

        let Some(responder) = self.fallback.clone() else {
            return Ok(stream);
        };

        let stream = stream.then(move |item| {
            let responder = responder.clone();
            let request = request.clone();

            async move {
                match item {
                    Err(error) if error.is_all_providers_failed() => {
                        match responder.respond(&request).await {
                            Some(text) => {
                                warn!(responder = responder.name(), "Streaming fell back to responder");
                                Ok(StreamChunk::terminal(
                                    responder.name(),
                                    FALLBACK_MODEL,
                                    FALLBACK_CONFIDENCE,
                                )
                                .with_content(text))
                            }
                            None => Err(error),
                        }
                    }
                    other => other,
                }
            }
        });

        Ok(Box::pin(stream))
    }

    /// Cache lookup failures are logged and treated as misses
    async fn reusable_hit(&self, query: &str) -> Option<CacheHit> {
        let hit = match self.cache.hybrid_search(query).await {
            Ok(hit) => hit?,
            Err(e) => {
                warn!("Semantic cache lookup failed: {}", e);
                return None;
            }
        };

        if hit.metadata.confidence > self.min_confidence_for_reuse {
            info!(
                similarity = hit.similarity,
                confidence = hit.metadata.confidence,
                "Serving answer from semantic cache"
            );
            Some(hit)
        } else {
            debug!(
                confidence = hit.metadata.confidence,
                threshold = self.min_confidence_for_reuse,
                "Cached answer below reuse confidence"
            );
            None
        }
    }

    async fn remember(&self, query: &str, response: &ChatResponse) {
        let tokens = response.tokens_used.unwrap_or(0);
        let options = EntryOptions::new()
            .with_model(&response.model)
            .with_token_count(tokens)
            .with_cost_estimate(estimate_cost(&response.model, tokens));

        if let Err(e) = self.cache.set(query, &response.content, options).await {
            warn!("Failed to cache response: {}", e);
        }
    }

    async fn fallback_response(
        &self,
        request: &ChatRequest,
        error: DomainError,
        started: Instant,
    ) -> Result<ChatResponse, DomainError> {
        let Some(responder) = &self.fallback else {
            return Err(error);
        };

        let Some(text) = responder.respond(request).await else {
            return Err(error);
        };

        warn!(responder = responder.name(), "All providers failed, using fallback responder");

        Ok(ChatResponse::new(text, responder.name(), FALLBACK_MODEL)
            .with_response_time_ms(started.elapsed().as_millis() as u64)
            .with_confidence(FALLBACK_CONFIDENCE))
    }
}

fn record_failure(request: &ChatRequest) {
    record_llm_request(ChatMetricParams {
        provider: "none",
        model: request.model.as_deref().unwrap_or("default"),
        outcome: ChatOutcome::Failed,
        tokens: None,
    });
}

fn cached_response(hit: CacheHit, started: Instant) -> ChatResponse {
    let model = hit.metadata.model;

    ChatResponse::new(hit.response, format!("{} (cached)", model), model)
        .with_tokens_used(0)
        .with_response_time_ms(started.elapsed().as_millis() as u64)
        .with_confidence(hit.metadata.confidence)
}
