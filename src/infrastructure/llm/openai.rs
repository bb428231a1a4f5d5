use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::http_client::{sse_data, HttpClientTrait};
use crate::domain::{
    ChatRequest, ChatResponse, ChunkStream, Message, ProviderAdapter, ProviderError, StreamChunk,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const PROBE_MAX_TOKENS: u32 = 10;

/// Chat-completions client for OpenAI and the vendors that mirror its API (Groq, Together)
#[derive(Debug)]
pub struct OpenAiCompatibleAdapter<C: HttpClientTrait> {
    client: C,
    vendor: &'static str,
    auth_header: String,
    base_url: String,
    default_model: String,
}

impl<C: HttpClientTrait> OpenAiCompatibleAdapter<C> {
    pub fn new(
        client: C,
        vendor: &'static str,
        api_key: impl AsRef<str>,
        default_model: impl Into<String>,
    ) -> Self {
        Self::with_base_url(client, vendor, api_key, default_model, DEFAULT_OPENAI_BASE_URL)
    }

    /// `base_url` includes the version segment, e.g. `https://api.groq.com/openai/v1`
    pub fn with_base_url(
        client: C,
        vendor: &'static str,
        api_key: impl AsRef<str>,
        default_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            vendor,
            auth_header: format!("Bearer {}", api_key.as_ref()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.default_model)
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> = request.messages.iter().map(OpenAiMessage::from).collect();

        let mut body = serde_json::json!({
            "model": self.model_for(request),
            "messages": messages,
            "stream": stream,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(
        &self,
        json: serde_json::Value,
        fallback_model: &str,
    ) -> Result<ChatResponse, ProviderError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::transient(format!("Failed to parse {} response: {}", self.vendor, e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::transient(format!("No choices in {} response", self.vendor)))?;

        let model = response.model.unwrap_or_else(|| fallback_model.to_string());
        let mut chat = ChatResponse::new(choice.message.content.unwrap_or_default(), self.vendor, model);

        if let Some(usage) = response.usage {
            chat = chat.with_tokens_used(usage.total_tokens);
        }

        Ok(chat)
    }
}

#[async_trait]
impl<C: HttpClientTrait + 'static> ProviderAdapter for OpenAiCompatibleAdapter<C> {
    async fn health_check(&self) -> bool {
        let probe = ChatRequest::builder()
            .user("Hi")
            .model(self.default_model.clone())
            .max_tokens(PROBE_MAX_TOKENS)
            .build();

        self.complete(&probe).await.is_ok()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.build_request(request, false);
        let response = self
            .client
            .post_json(&self.chat_completions_url(), self.headers(), &body)
            .await?;

        self.parse_response(response, self.model_for(request))
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
        let body = self.build_request(request, true);
        let bytes = self
            .client
            .post_json_stream(&self.chat_completions_url(), self.headers(), &body)
            .await?;

        let vendor = self.vendor;
        let model = self.model_for(request).to_string();

        let chunks = sse_data(bytes).filter_map(move |event| {
            let chunk = match event {
                Ok(data) => parse_sse_data(&data, vendor, &model).map(Ok),
                Err(e) => Some(Err(e)),
            };
            async move { chunk }
        });

        Ok(Box::pin(chunks))
    }

    fn vendor(&self) -> &'static str {
        self.vendor
    }
}

fn parse_sse_data(data: &str, vendor: &str, model: &str) -> Option<StreamChunk> {
    if data.trim() == "[DONE]" {
        return Some(StreamChunk::terminal(vendor, model, 0.0));
    }

    let chunk: OpenAiStreamChunk = serde_json::from_str(data).ok()?;
    let choice = chunk.choices.into_iter().next()?;
    let model = chunk.model.unwrap_or_else(|| model.to_string());

    Some(StreamChunk::delta(
        choice.delta.content.unwrap_or_default(),
        vendor,
        model,
    ))
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for OpenAiMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    model: Option<String>,
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use bytes::Bytes;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18 }
        })
    }

    #[tokio::test]
    async fn test_openai_complete() {
        let client = MockHttpClient::new().with_response(TEST_URL, completion("Hello! How can I help you?"));
        let adapter = OpenAiCompatibleAdapter::new(client, "openai", "sk-test-key", "gpt-4-turbo-preview");

        let request = ChatRequest::builder().user("Hello!").temperature(0.2).build();
        let response = adapter.complete(&request).await.unwrap();

        assert_eq!(response.content, "Hello! How can I help you?");
        assert_eq!(response.model, "gpt-4");
        assert_eq!(response.tokens_used, Some(18));
    }

    #[tokio::test]
    async fn test_request_model_overrides_default() {
        let client = MockHttpClient::new().with_response(TEST_URL, completion("ok"));
        let adapter = OpenAiCompatibleAdapter::new(client, "openai", "sk-test-key", "gpt-4-turbo-preview");

        adapter
            .complete(&ChatRequest::builder().user("a").build())
            .await
            .unwrap();
        adapter
            .complete(&ChatRequest::builder().user("b").model("gpt-3.5-turbo").build())
            .await
            .unwrap();

        let bodies = adapter.client.bodies();
        assert_eq!(bodies[0]["model"], "gpt-4-turbo-preview");
        assert_eq!(bodies[1]["model"], "gpt-3.5-turbo");
        assert_eq!(bodies[0]["stream"], false);
    }

    #[tokio::test]
    async fn test_error_kind_is_preserved() {
        let client = MockHttpClient::new()
            .with_error(TEST_URL, ProviderError::from_status(401, "API key invalid"));
        let adapter = OpenAiCompatibleAdapter::new(client, "openai", "bad-key-value", "gpt-4");

        let error = adapter
            .complete(&ChatRequest::builder().user("Hello!").build())
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Fatal);
        assert!(!adapter.health_check().await);
    }

    #[tokio::test]
    async fn test_groq_base_url_and_probe() {
        let url = "https://api.groq.com/openai/v1/chat/completions";
        let client = MockHttpClient::new().with_response(url, completion("Hello"));
        let adapter = OpenAiCompatibleAdapter::with_base_url(
            client,
            "groq",
            "gsk_test_key",
            "mixtral-8x7b-32768",
            "https://api.groq.com/openai/v1/",
        );

        assert!(adapter.health_check().await);
        assert_eq!(adapter.vendor(), "groq");

        let probe = &adapter.client.bodies()[0];
        assert_eq!(probe["max_tokens"], 10);
        assert_eq!(probe["messages"][0]["content"], "Hi");
    }

    #[tokio::test]
    async fn test_openai_stream() {
        let sse = concat!(
            "data: {\"model\":\"gpt-4\",\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"model\":\"gpt-4\",\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"model\":\"gpt-4\",\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let client = MockHttpClient::new()
            .with_stream_response(TEST_URL, vec![Bytes::from(&sse[..50]), Bytes::from(&sse[50..])]);
        let adapter = OpenAiCompatibleAdapter::new(client, "openai", "sk-test-key", "gpt-4");

        let chunks: Vec<StreamChunk> = adapter
            .stream(&ChatRequest::builder().user("hi").build())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(text, "Hello");
        assert!(chunks.last().unwrap().done);
        assert_eq!(adapter.client.bodies()[0]["stream"], true);
    }
}
