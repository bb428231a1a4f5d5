use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::{ChatRequest, ChatResponse, StreamChunk};
use crate::domain::error::ProviderError;

#[cfg(test)]
use mockall::automock;

/// Stream of chunks produced by a single provider call
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProviderError>> + Send>>;

/// Vendor-specific client behind a registered provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Cheap liveness probe; any failure maps to `false`
    async fn health_check(&self) -> bool;

    /// Single non-streaming completion
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Streaming completion
    async fn stream(&self, _request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
        Err(ProviderError::fatal("streaming not supported"))
    }

    /// Vendor label, e.g. "openai"
    fn vendor(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Adapter that fails a fixed number of times before answering
    #[derive(Debug)]
    pub struct ScriptedAdapter {
        content: String,
        model: String,
        failures_before_success: u32,
        failure: ProviderError,
        healthy: bool,
        health_delay: Option<Duration>,
        complete_delay: Option<Duration>,
        stream_fail_after: Option<usize>,
        calls: AtomicU32,
        health_calls: AtomicU32,
    }

    impl ScriptedAdapter {
        pub fn new(content: impl Into<String>) -> Self {
            Self {
                content: content.into(),
                model: "mock-model".to_string(),
                failures_before_success: 0,
                failure: ProviderError::transient("scripted failure"),
                healthy: true,
                health_delay: None,
                complete_delay: None,
                stream_fail_after: None,
                calls: AtomicU32::new(0),
                health_calls: AtomicU32::new(0),
            }
        }

        /// Adapter whose every call fails with `error`
        pub fn failing(error: ProviderError) -> Self {
            Self::new("").with_failures(u32::MAX, error)
        }

        pub fn with_failures(mut self, count: u32, error: ProviderError) -> Self {
            self.failures_before_success = count;
            self.failure = error;
            self
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = model.into();
            self
        }

        pub fn with_health(mut self, healthy: bool) -> Self {
            self.healthy = healthy;
            self
        }

        pub fn with_health_delay(mut self, delay: Duration) -> Self {
            self.health_delay = Some(delay);
            self
        }

        pub fn with_complete_delay(mut self, delay: Duration) -> Self {
            self.complete_delay = Some(delay);
            self
        }

        /// Emit `count` chunks and then a transient error
        pub fn with_stream_failure_after(mut self, count: usize) -> Self {
            self.stream_fail_after = Some(count);
            self
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn health_calls(&self) -> u32 {
            self.health_calls.load(Ordering::SeqCst)
        }

        fn next_call_fails(&self) -> bool {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            call < self.failures_before_success
        }

        fn words(&self) -> Vec<String> {
            self.content
                .split_inclusive(' ')
                .map(str::to_string)
                .collect()
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        async fn health_check(&self) -> bool {
            self.health_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.health_delay {
                tokio::time::sleep(delay).await;
            }

            self.healthy
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            if let Some(delay) = self.complete_delay {
                tokio::time::sleep(delay).await;
            }

            if self.next_call_fails() {
                return Err(self.failure.clone());
            }

            let tokens = (self.content.chars().count() / 4) as u32;
            Ok(ChatResponse::new(&self.content, "mock", &self.model).with_tokens_used(tokens))
        }

        async fn stream(&self, _request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
            if self.next_call_fails() {
                return Err(self.failure.clone());
            }

            let words = self.words();
            let mut items: Vec<Result<StreamChunk, ProviderError>> = Vec::new();

            match self.stream_fail_after {
                Some(limit) => {
                    for word in words.into_iter().take(limit) {
                        items.push(Ok(StreamChunk::delta(word, "mock", &self.model)));
                    }
                    items.push(Err(ProviderError::transient("connection reset mid-stream")));
                }
                None => {
                    for word in words {
                        items.push(Ok(StreamChunk::delta(word, "mock", &self.model)));
                    }
                    items.push(Ok(StreamChunk::terminal("mock", &self.model, 0.0)));
                }
            }

            Ok(Box::pin(stream::iter(items)))
        }

        fn vendor(&self) -> &'static str {
            "mock"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedAdapter;
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_scripted_adapter_recovers() {
        let adapter = ScriptedAdapter::new("hello").with_failures(2, ProviderError::transient("503"));
        let request = ChatRequest::builder().user("hi").build();

        assert!(adapter.complete(&request).await.is_err());
        assert!(adapter.complete(&request).await.is_err());
        let response = adapter.complete(&request).await.unwrap();

        assert_eq!(response.content, "hello");
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_default_stream_is_unsupported() {
        let mut adapter = MockProviderAdapter::new();
        adapter
            .expect_stream()
            .returning(|_| Err(ProviderError::fatal("streaming not supported")));

        let request = ChatRequest::builder().user("hi").build();
        let error = adapter.stream(&request).await.err().unwrap();
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn test_scripted_stream_splits_words() {
        let adapter = ScriptedAdapter::new("one two three");
        let request = ChatRequest::builder().user("hi").build();

        let chunks: Vec<_> = adapter.stream(&request).await.unwrap().collect().await;
        let text: String = chunks
            .iter()
            .filter_map(|c| c.as_ref().ok())
            .map(|c| c.content.as_str())
            .collect();

        assert_eq!(text, "one two three");
        assert_eq!(chunks.len(), 4);
    }
}
