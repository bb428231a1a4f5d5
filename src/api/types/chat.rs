//! OpenAI-compatible chat completion types
//!
//! Responses carry three relay extensions next to the standard fields:
//! `provider`, `confidence` and `response_time_ms`.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatRequest, ChatResponse, Message, MessageRole, StreamChunk};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<ChatMessage> for Message {
    fn from(message: ChatMessage) -> Self {
        Message::new(message.role, message.content)
    }
}

/// POST /v1/chat/completions body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Overrides each provider's default model when set
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    pub fn into_domain(self) -> ChatRequest {
        ChatRequest {
            messages: self.messages.into_iter().map(Message::from).collect(),
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: self.stream,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub provider: String,
    pub confidence: f32,
    pub response_time_ms: u64,
}

impl ChatCompletionResponse {
    pub fn from_domain(response: ChatResponse, request_id: &str) -> Self {
        Self {
            id: format!("chatcmpl-{}", request_id),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: response.model,
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: ChatMessage {
                    role: MessageRole::Assistant,
                    content: response.content,
                },
                finish_reason: "stop".to_string(),
            }],
            usage: response.tokens_used.map(|total_tokens| Usage { total_tokens }),
            provider: response.provider,
            confidence: response.confidence,
            response_time_ms: response.response_time_ms,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamChoice {
    pub index: u32,
    pub delta: DeltaContent,
    pub finish_reason: Option<String>,
}

/// One SSE `data:` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub provider: String,
    pub choices: Vec<ChatCompletionStreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ChatCompletionStreamResponse {
    pub fn from_chunk(chunk: StreamChunk, request_id: &str) -> Self {
        let content = (!chunk.content.is_empty()).then_some(chunk.content);

        Self {
            id: format!("chatcmpl-{}", request_id),
            object: "chat.completion.chunk".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: chunk.model,
            provider: chunk.provider,
            choices: vec![ChatCompletionStreamChoice {
                index: 0,
                delta: DeltaContent { content },
                finish_reason: chunk.done.then(|| "stop".to_string()),
            }],
            confidence: chunk.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_into_domain() {
        let request: ChatCompletionRequest = serde_json::from_value(serde_json::json!({
            "messages": [
                { "role": "system", "content": "Be brief" },
                { "role": "user", "content": "What is your pricing?" }
            ],
            "temperature": 0.3
        }))
        .unwrap();

        let domain = request.into_domain();
        assert_eq!(domain.messages.len(), 2);
        assert_eq!(domain.last_user_message(), Some("What is your pricing?"));
        assert_eq!(domain.temperature, Some(0.3));
        assert!(domain.model.is_none());
        assert!(!domain.stream);
    }

    #[test]
    fn test_response_from_domain() {
        let response = ChatResponse::new("Hello", "Groq", "mixtral-8x7b-32768")
            .with_tokens_used(12)
            .with_confidence(0.85);

        let api = ChatCompletionResponse::from_domain(response, "abc");
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json["id"], "chatcmpl-abc");
        assert_eq!(json["choices"][0]["message"]["role"], "assistant");
        assert_eq!(json["choices"][0]["message"]["content"], "Hello");
        assert_eq!(json["usage"]["total_tokens"], 12);
        assert_eq!(json["provider"], "Groq");
    }

    #[test]
    fn test_terminal_chunk_frame() {
        let frame = ChatCompletionStreamResponse::from_chunk(
            StreamChunk::terminal("OpenAI", "gpt-4", 0.9),
            "abc",
        );
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert!(json["choices"][0]["delta"].get("content").is_none());
        assert!((json["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }
}
