use serde::{Deserialize, Serialize};

/// Canonical completion produced by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    pub response_time_ms: u64,
    pub confidence: f32,
}

impl ChatResponse {
    pub fn new(
        content: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            provider: provider.into(),
            model: model.into(),
            tokens_used: None,
            response_time_ms: 0,
            confidence: 0.0,
        }
    }

    pub fn with_tokens_used(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_response_time_ms(mut self, elapsed_ms: u64) -> Self {
        self.response_time_ms = elapsed_ms;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// One fragment of a streamed completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl StreamChunk {
    /// A content fragment
    pub fn delta(
        content: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            done: false,
            provider: provider.into(),
            model: model.into(),
            confidence: None,
        }
    }

    /// The single chunk that closes a stream
    pub fn terminal(provider: impl Into<String>, model: impl Into<String>, confidence: f32) -> Self {
        Self {
            content: String::new(),
            done: true,
            provider: provider.into(),
            model: model.into(),
            confidence: Some(confidence.clamp(0.0, 1.0)),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}
