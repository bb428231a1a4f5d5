use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::http_client::{sse_data, HttpClientTrait};
use crate::domain::{
    ChatRequest, ChatResponse, ChunkStream, Message, MessageRole, ProviderAdapter, ProviderError,
    StreamChunk,
};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const PROBE_MODEL: &str = "claude-3-haiku-20240307";
const PROBE_MAX_TOKENS: u32 = 10;

/// Anthropic messages API adapter
#[derive(Debug)]
pub struct AnthropicAdapter<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl<C: HttpClientTrait> AnthropicAdapter<C> {
    pub fn new(client: C, api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, default_model, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.default_model)
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> serde_json::Value {
        let (system, messages) = split_system_messages(&request.messages);

        let anthropic_messages: Vec<AnthropicMessage> =
            messages.into_iter().map(AnthropicMessage::from).collect();

        let mut body = serde_json::json!({
            "model": self.model_for(request),
            "messages": anthropic_messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": stream,
        });

        if let Some(system_content) = system {
            body["system"] = serde_json::json!(system_content);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse, ProviderError> {
        let response: AnthropicResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::transient(format!("Failed to parse anthropic response: {}", e))
        })?;

        let content = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<String>();

        let tokens = response.usage.input_tokens + response.usage.output_tokens;

        Ok(ChatResponse::new(content, "anthropic", response.model).with_tokens_used(tokens))
    }
}

/// Anthropic takes system prompts as a top-level field
fn split_system_messages(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let (system, rest): (Vec<&Message>, Vec<&Message>) = messages
        .iter()
        .partition(|m| m.role == MessageRole::System);

    let system_content = system
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let system = (!system_content.is_empty()).then_some(system_content);
    (system, rest)
}

#[async_trait]
impl<C: HttpClientTrait + 'static> ProviderAdapter for AnthropicAdapter<C> {
    async fn health_check(&self) -> bool {
        let probe = ChatRequest::builder()
            .user("Hi")
            .model(PROBE_MODEL)
            .max_tokens(PROBE_MAX_TOKENS)
            .build();

        self.complete(&probe).await.is_ok()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.build_request(request, false);
        let response = self
            .client
            .post_json(&self.messages_url(), self.headers(), &body)
            .await?;

        self.parse_response(response)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
        let body = self.build_request(request, true);
        let bytes = self
            .client
            .post_json_stream(&self.messages_url(), self.headers(), &body)
            .await?;

        let model = self.model_for(request).to_string();

        let chunks = sse_data(bytes).filter_map(move |event| {
            let chunk = match event {
                Ok(data) => parse_sse_event(&data, &model),
                Err(e) => Some(Err(e)),
            };
            async move { chunk }
        });

        Ok(Box::pin(chunks))
    }

    fn vendor(&self) -> &'static str {
        "anthropic"
    }
}

fn parse_sse_event(data: &str, model: &str) -> Option<Result<StreamChunk, ProviderError>> {
    let event: AnthropicStreamEvent = serde_json::from_str(data).ok()?;

    match event.event_type.as_str() {
        "content_block_delta" => {
            let text = event.delta?.text?;
            Some(Ok(StreamChunk::delta(text, "anthropic", model)))
        }
        "message_stop" => Some(Ok(StreamChunk::terminal("anthropic", model, 0.0))),
        "error" => {
            let message = event
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "stream error".to_string());
            Some(Err(ProviderError::transient(message)))
        }
        _ => None,
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for AnthropicMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<StreamDelta>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use bytes::Bytes;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn message(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-sonnet-20240229",
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 12, "output_tokens": 10 }
        })
    }

    #[tokio::test]
    async fn test_anthropic_complete() {
        let client = MockHttpClient::new().with_response(TEST_URL, message("Hello! How can I assist you today?"));
        let adapter = AnthropicAdapter::new(client, "sk-ant-test-key", "claude-3-sonnet-20240229");

        let request = ChatRequest::builder()
            .system("You are helpful")
            .user("Hello!")
            .build();

        let response = adapter.complete(&request).await.unwrap();

        assert_eq!(response.content, "Hello! How can I assist you today?");
        assert_eq!(response.tokens_used, Some(22));
        assert_eq!(response.model, "claude-3-sonnet-20240229");
    }

    #[tokio::test]
    async fn test_system_messages_are_lifted() {
        let client = MockHttpClient::new().with_response(TEST_URL, message("Response"));
        let adapter = AnthropicAdapter::new(client, "sk-ant-test-key", "claude-3-sonnet-20240229");

        let request = ChatRequest::builder()
            .system("System prompt 1")
            .system("System prompt 2")
            .user("Hello")
            .build();

        adapter.complete(&request).await.unwrap();

        let body = &adapter.client.bodies()[0];
        assert_eq!(body["system"], "System prompt 1\nSystem prompt 2");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["max_tokens"], 4096);
    }

    #[tokio::test]
    async fn test_probe_uses_small_model() {
        let client = MockHttpClient::new().with_response(TEST_URL, message("Hi"));
        let adapter = AnthropicAdapter::new(client, "sk-ant-test-key", "claude-3-sonnet-20240229");

        assert!(adapter.health_check().await);

        let body = &adapter.client.bodies()[0];
        assert_eq!(body["model"], PROBE_MODEL);
        assert_eq!(body["max_tokens"], 10);
    }

    #[tokio::test]
    async fn test_anthropic_stream() {
        let sse = concat!(
            "event: message_start\ndata: {\"type\":\"message_start\"}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi \"}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"there\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        );
        let client = MockHttpClient::new().with_stream_response(TEST_URL, vec![Bytes::from(sse)]);
        let adapter = AnthropicAdapter::new(client, "sk-ant-test-key", "claude-3-sonnet-20240229");

        let chunks: Vec<StreamChunk> = adapter
            .stream(&ChatRequest::builder().user("hi").build())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "Hi ");
        assert!(chunks[2].done);
    }

    #[tokio::test]
    async fn test_stream_error_event() {
        let sse = "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        let client = MockHttpClient::new().with_stream_response(TEST_URL, vec![Bytes::from(sse)]);
        let adapter = AnthropicAdapter::new(client, "sk-ant-test-key", "claude-3-sonnet-20240229");

        let items: Vec<_> = adapter
            .stream(&ChatRequest::builder().user("hi").build())
            .await
            .unwrap()
            .collect()
            .await;

        assert!(matches!(&items[0], Err(e) if e.message == "Overloaded"));
    }
}
