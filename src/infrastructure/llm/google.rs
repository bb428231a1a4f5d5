use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::http_client::{sse_data, HttpClientTrait};
use crate::domain::{
    ChatRequest, ChatResponse, ChunkStream, Message, MessageRole, ProviderAdapter, ProviderError,
    StreamChunk,
};

pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const HEALTH_MAX_OUTPUT_TOKENS: u32 = 10;

/// Gemini `generateContent` adapter
#[derive(Debug)]
pub struct GoogleAdapter<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl<C: HttpClientTrait> GoogleAdapter<C> {
    pub fn new(client: C, api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, default_model, DEFAULT_GOOGLE_BASE_URL)
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

    fn generate_url(&self, model: &str) -> String {
        format!("{}/{}/models/{}:generateContent", self.base_url, API_VERSION, model)
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, API_VERSION, model
        )
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.default_model)
    }

    fn build_request(&self, request: &ChatRequest) -> serde_json::Value {
        let (system, turns): (Vec<&Message>, Vec<&Message>) = request
            .messages
            .iter()
            .partition(|m| m.role == MessageRole::System);

        let contents: Vec<GeminiContent> = turns.into_iter().map(GeminiContent::from).collect();

        let mut body = serde_json::json!({ "contents": contents });

        if !system.is_empty() {
            let parts: Vec<GeminiPart> = system
                .iter()
                .map(|m| GeminiPart {
                    text: m.content.clone(),
                })
                .collect();
            body["systemInstruction"] = serde_json::json!({ "parts": parts });
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(temp) = request.temperature {
            generation_config.insert("temperature".into(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config.insert("maxOutputTokens".into(), serde_json::json!(max_tokens));
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = serde_json::Value::Object(generation_config);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-goog-api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(
        &self,
        json: serde_json::Value,
        requested_model: &str,
    ) -> Result<ChatResponse, ProviderError> {
        let response: GeminiResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::transient(format!("Failed to parse google response: {}", e))
        })?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ProviderError::fatal(format!("Google returned no content: {}", reason)));
        };

        let model = response
            .model_version
            .unwrap_or_else(|| requested_model.to_string());
        let mut chat = ChatResponse::new(candidate.text(), "google", model);

        if let Some(total) = response.usage_metadata.and_then(|u| u.total_token_count) {
            chat = chat.with_tokens_used(total);
        }

        Ok(chat)
    }
}

#[async_trait]
impl<C: HttpClientTrait + 'static> ProviderAdapter for GoogleAdapter<C> {
    async fn health_check(&self) -> bool {
        let request = ChatRequest::builder()
            .user("Hi")
            .max_tokens(HEALTH_MAX_OUTPUT_TOKENS)
            .build();

        matches!(self.complete(&request).await, Ok(response) if !response.content.is_empty())
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = self.model_for(request);
        let body = self.build_request(request);
        let response = self
            .client
            .post_json(&self.generate_url(model), self.headers(), &body)
            .await?;

        self.parse_response(response, model)
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
        let model = self.model_for(request).to_string();
        let body = self.build_request(request);
        let bytes = self
            .client
            .post_json_stream(&self.stream_url(&model), self.headers(), &body)
            .await?;

        let chunks = sse_data(bytes).filter_map(move |event| {
            let chunk = match event {
                Ok(data) => parse_stream_event(&data, &model),
                Err(e) => Some(Err(e)),
            };
            async move { chunk }
        });

        Ok(Box::pin(chunks))
    }

    fn vendor(&self) -> &'static str {
        "google"
    }
}

/// Each SSE event carries a full `GenerateContentResponse` holding the next slice of text
fn parse_stream_event(data: &str, model: &str) -> Option<Result<StreamChunk, ProviderError>> {
    let response: GeminiResponse = serde_json::from_str(data).ok()?;
    let model = response.model_version.as_deref().unwrap_or(model);
    let candidate = response.candidates.into_iter().next()?;

    let text = candidate.text();
    if !text.is_empty() {
        return Some(Ok(StreamChunk::delta(text, "google", model)));
    }

    candidate
        .finish_reason
        .map(|_| Ok(StreamChunk::terminal("google", model, 0.0)))
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

impl From<&Message> for GeminiContent {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::Assistant => "model",
            _ => "user",
        };

        Self {
            role,
            parts: vec![GeminiPart {
                text: message.content.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use bytes::Bytes;

    const GENERATE_URL: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
    const STREAM_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:streamGenerateContent?alt=sse";

    fn generation(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 4,
                "candidatesTokenCount": 9,
                "totalTokenCount": 13
            }
        })
    }

    #[tokio::test]
    async fn test_google_complete() {
        let client = MockHttpClient::new().with_response(GENERATE_URL, generation("Bonjour!"));
        let adapter = GoogleAdapter::new(client, "AIza-test-key", "gemini-pro");

        let request = ChatRequest::builder()
            .system("Answer in French")
            .user("Hello")
            .assistant("Salut")
            .user("Again")
            .temperature(0.2)
            .build();

        let response = adapter.complete(&request).await.unwrap();

        assert_eq!(response.content, "Bonjour!");
        assert_eq!(response.provider, "google");
        assert_eq!(response.model, "gemini-pro");
        assert_eq!(response.tokens_used, Some(13));

        let body = &adapter.client.bodies()[0];
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Answer in French");
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "Again");
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[tokio::test]
    async fn test_request_model_selects_endpoint() {
        let url = "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
        let client = MockHttpClient::new().with_response(url, generation("ok"));
        let adapter = GoogleAdapter::new(client, "AIza-test-key", "gemini-pro");

        let request = ChatRequest::builder().user("hi").model("gemini-1.5-flash").build();
        let response = adapter.complete(&request).await.unwrap();

        assert_eq!(response.model, "gemini-1.5-flash");
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_fatal() {
        let blocked = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let client = MockHttpClient::new().with_response(GENERATE_URL, blocked);
        let adapter = GoogleAdapter::new(client, "AIza-test-key", "gemini-pro");

        let error = adapter
            .complete(&ChatRequest::builder().user("hi").build())
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Fatal);
        assert!(error.message.contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_health_check_requires_text() {
        let healthy = GoogleAdapter::new(
            MockHttpClient::new().with_response(GENERATE_URL, generation("Hello")),
            "AIza-test-key",
            "gemini-pro",
        );
        assert!(healthy.health_check().await);
        assert_eq!(healthy.client.bodies()[0]["generationConfig"]["maxOutputTokens"], 10);

        let empty = GoogleAdapter::new(
            MockHttpClient::new().with_response(GENERATE_URL, generation("")),
            "AIza-test-key",
            "gemini-pro",
        );
        assert!(!empty.health_check().await);
    }

    #[tokio::test]
    async fn test_google_stream() {
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}],\"role\":\"model\"}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}],\"role\":\"model\"},\"finishReason\":\"STOP\"}]}\r\n\r\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}],\"usageMetadata\":{\"totalTokenCount\":5}}\r\n\r\n",
        );
        let client = MockHttpClient::new().with_stream_response(STREAM_URL, vec![Bytes::from(sse)]);
        let adapter = GoogleAdapter::new(client, "AIza-test-key", "gemini-pro");

        let chunks: Vec<StreamChunk> = adapter
            .stream(&ChatRequest::builder().user("hi").build())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "Hel");
        assert_eq!(chunks[1].content, "lo");
        assert!(chunks[2].done);
    }
}
