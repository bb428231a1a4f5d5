use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::http_client::{json_values, HttpClientTrait};
use crate::domain::{
    ChatRequest, ChatResponse, ChunkStream, Message, MessageRole, ProviderAdapter, ProviderError,
    StreamChunk,
};

pub const DEFAULT_COHERE_BASE_URL: &str = "https://api.cohere.ai";
const HEALTH_MAX_TOKENS: u32 = 10;

/// Cohere `/v1/chat` adapter
#[derive(Debug)]
pub struct CohereAdapter<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    default_model: String,
}

impl<C: HttpClientTrait> CohereAdapter<C> {
    pub fn new(client: C, api_key: impl AsRef<str>, default_model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, default_model, DEFAULT_COHERE_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl AsRef<str>,
        default_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.as_ref()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat", self.base_url)
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.default_model)
    }

    /// The last turn becomes `message`; earlier turns go to `chat_history`
    fn build_request(&self, request: &ChatRequest, stream: bool) -> serde_json::Value {
        let (system, mut turns): (Vec<&Message>, Vec<&Message>) = request
            .messages
            .iter()
            .partition(|m| m.role == MessageRole::System);

        let message = turns.pop().map(|m| m.content.clone()).unwrap_or_default();
        let chat_history: Vec<CohereTurn> = turns.into_iter().map(CohereTurn::from).collect();

        let mut body = serde_json::json!({
            "model": self.model_for(request),
            "message": message,
            "chat_history": chat_history,
            "stream": stream,
        });

        if !system.is_empty() {
            let preamble = system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            body["preamble"] = serde_json::json!(preamble);
        }

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
        model: &str,
    ) -> Result<ChatResponse, ProviderError> {
        let response: CohereResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::transient(format!("Failed to parse cohere response: {}", e))
        })?;

        let mut chat = ChatResponse::new(response.text, "cohere", model);

        if let Some(tokens) = response.meta.and_then(|m| m.tokens) {
            chat = chat.with_tokens_used(tokens.input_tokens + tokens.output_tokens);
        }

        Ok(chat)
    }
}

#[async_trait]
impl<C: HttpClientTrait + 'static> ProviderAdapter for CohereAdapter<C> {
    async fn health_check(&self) -> bool {
        let request = ChatRequest::builder()
            .user("Hi")
            .max_tokens(HEALTH_MAX_TOKENS)
            .build();

        matches!(self.complete(&request).await, Ok(response) if !response.content.is_empty())
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.build_request(request, false);
        let response = self
            .client
            .post_json(&self.chat_url(), self.headers(), &body)
            .await?;

        self.parse_response(response, self.model_for(request))
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
        let body = self.build_request(request, true);
        let bytes = self
            .client
            .post_json_stream(&self.chat_url(), self.headers(), &body)
            .await?;

        let model = self.model_for(request).to_string();

        let chunks = json_values(bytes).filter_map(move |event| {
            let chunk = match event {
                Ok(value) => parse_stream_event(value, &model),
                Err(e) => Some(Err(e)),
            };
            async move { chunk }
        });

        Ok(Box::pin(chunks))
    }

    fn vendor(&self) -> &'static str {
        "cohere"
    }
}

fn parse_stream_event(
    value: serde_json::Value,
    model: &str,
) -> Option<Result<StreamChunk, ProviderError>> {
    let event: CohereStreamEvent = serde_json::from_value(value).ok()?;

    match event.event_type.as_str() {
        "text-generation" => Some(Ok(StreamChunk::delta(event.text?, "cohere", model))),
        "stream-end" if event.finish_reason.as_deref() == Some("ERROR") => {
            Some(Err(ProviderError::transient("cohere stream ended with an error")))
        }
        "stream-end" => Some(Ok(StreamChunk::terminal("cohere", model, 0.0))),
        _ => None,
    }
}

// Cohere API types

#[derive(Debug, Serialize)]
struct CohereTurn {
    role: &'static str,
    message: String,
}

impl From<&Message> for CohereTurn {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::Assistant => "CHATBOT",
            _ => "USER",
        };

        Self {
            role,
            message: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CohereResponse {
    text: String,
    meta: Option<CohereMeta>,
}

#[derive(Debug, Deserialize)]
struct CohereMeta {
    tokens: Option<CohereTokens>,
}

#[derive(Debug, Deserialize)]
struct CohereTokens {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CohereStreamEvent {
    event_type: String,
    text: Option<String>,
    finish_reason: Option<String>,
}
