use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::llm::ChatRequest;

/// Last-resort answer source used by the calling layer once every provider failed
#[async_trait]
pub trait FallbackResponder: Send + Sync + Debug {
    /// Text to serve instead of a provider answer, if any
    async fn respond(&self, request: &ChatRequest) -> Option<String>;

    /// Label reported as the response provider
    fn name(&self) -> &str;
}
