use async_trait::async_trait;

use crate::domain::{ChatRequest, FallbackResponder};

pub const DEFAULT_FALLBACK_NAME: &str = "Fallback Responder";
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "I'm having trouble reaching our AI providers right now. Please try again in a moment.";

/// Serves one configured message whenever the provider chain is exhausted
#[derive(Debug, Clone)]
pub struct StaticFallbackResponder {
    name: String,
    message: String,
}

impl StaticFallbackResponder {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl Default for StaticFallbackResponder {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_NAME, DEFAULT_FALLBACK_MESSAGE)
    }
}

#[async_trait]
impl FallbackResponder for StaticFallbackResponder {
    async fn respond(&self, _request: &ChatRequest) -> Option<String> {
        (!self.message.trim().is_empty()).then(|| self.message.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_message() {
        let responder = StaticFallbackResponder::default();
        let request = ChatRequest::builder().user("hi").build();

        assert_eq!(
            responder.respond(&request).await.as_deref(),
            Some(DEFAULT_FALLBACK_MESSAGE)
        );
        assert_eq!(responder.name(), DEFAULT_FALLBACK_NAME);
    }

    #[tokio::test]
    async fn test_blank_message_declines() {
        let responder = StaticFallbackResponder::new("Fallback", "   ");
        let request = ChatRequest::builder().user("hi").build();

        assert!(responder.respond(&request).await.is_none());
    }
}
