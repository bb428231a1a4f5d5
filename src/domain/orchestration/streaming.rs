//! Streaming fallback: one active provider per stream, restart from scratch on failure

use std::pin::Pin;

use futures::{Stream, StreamExt};
use metrics::counter;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use super::confidence::score_confidence;
use super::health::HealthProber;
use crate::domain::error::{ProviderError, ProviderFailure};
use crate::domain::llm::{ChatRequest, StreamChunk};
use crate::domain::provider::ProviderHandle;
use crate::domain::DomainError;

/// Stream handed to callers; ends with one `done` chunk or one error item
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, DomainError>> + Send>>;

const CHANNEL_CAPACITY: usize = 64;

type ChunkSender = mpsc::Sender<Result<StreamChunk, DomainError>>;

/// Outcome of one provider's streaming attempt
enum Attempt {
    Completed,
    Failed(ProviderError),
    ReceiverGone,
}

#[derive(Debug, Clone)]
pub struct StreamingMultiplexer {
    prober: HealthProber,
}

impl StreamingMultiplexer {
    pub fn new(prober: HealthProber) -> Self {
        Self { prober }
    }

    /// Probe, then stream `request` through the candidate list
    pub async fn stream(&self, request: ChatRequest) -> ChatStream {
        let candidates = self.prober.candidates().await;
        Self::stream_with(candidates, request)
    }

    /// Stream over an explicit candidate list
    pub fn stream_with(candidates: Vec<ProviderHandle>, request: ChatRequest) -> ChatStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            run_chain(candidates, request, tx).await;
        });

        Box::pin(ReceiverStream::new(rx))
    }
}

async fn run_chain(candidates: Vec<ProviderHandle>, request: ChatRequest, tx: ChunkSender) {
    let mut failures = Vec::with_capacity(candidates.len());

    for candidate in &candidates {
        let outcome = stream_from(candidate, &request, &tx).await;
        let status = match &outcome {
            Attempt::Completed => "success",
            Attempt::Failed(_) => "error",
            Attempt::ReceiverGone => "cancelled",
        };

        counter!(
            "llm_provider_attempts_total",
            "provider" => candidate.config.id.clone(),
            "status" => status
        )
        .increment(1);

        match outcome {
            Attempt::Completed | Attempt::ReceiverGone => return,
            Attempt::Failed(error) => {
                warn!(
                    provider = %candidate.config.id,
                    kind = %error.kind,
                    error = %error.message,
                    "Streaming attempt failed"
                );
                failures.push(ProviderFailure::new(candidate.config.name.clone(), 1, &error));
            }
        }
    }

    warn!(attempted = failures.len(), "All providers failed to stream");
    let _ = tx
        .send(Err(DomainError::all_providers_failed(failures)))
        .await;
}

async fn stream_from(candidate: &ProviderHandle, request: &ChatRequest, tx: &ChunkSender) -> Attempt {
    let config = &candidate.config;
    let timeout = config.timeout();

    let mut upstream = match tokio::time::timeout(timeout, candidate.client.stream(request)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(error)) => return Attempt::Failed(error),
        Err(_) => {
            return Attempt::Failed(ProviderError::timeout(format!(
                "stream did not open within {}ms",
                config.timeout_ms
            )));
        }
    };

    let mut content = String::new();
    let mut model = request.model.clone().unwrap_or_default();

    loop {
        let next = match tokio::time::timeout(timeout, upstream.next()).await {
            Ok(next) => next,
            Err(_) => {
                return Attempt::Failed(ProviderError::timeout(format!(
                    "no chunk received within {}ms",
                    config.timeout_ms
                )));
            }
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(error)) => return Attempt::Failed(error),
            None => break,
        };

        if !chunk.model.is_empty() {
            model = chunk.model.clone();
        }

        if !chunk.content.is_empty() {
            content.push_str(&chunk.content);
            let delta = StreamChunk::delta(chunk.content, config.name.clone(), model.clone());

            if tx.send(Ok(delta)).await.is_err() {
                return Attempt::ReceiverGone;
            }
        }

        if chunk.done {
            break;
        }
    }

    let confidence = score_confidence(&content, &config.name);

    info!(
        provider = %config.id,
        chars = content.chars().count(),
        confidence,
        "Provider finished streaming"
    );

    if tx
        .send(Ok(StreamChunk::terminal(config.name.clone(), model, confidence)))
        .await
        .is_err()
    {
        return Attempt::ReceiverGone;
    }

    Attempt::Completed
}
