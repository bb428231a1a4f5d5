//! OpenAI-compatible API types

pub mod chat;
pub mod error;
pub mod json;

pub use chat::{
    ChatCompletionChoice, ChatCompletionRequest, ChatCompletionResponse,
    ChatCompletionStreamChoice, ChatCompletionStreamResponse, ChatMessage, DeltaContent, Usage,
};
pub use error::{ApiError, ApiErrorDetail, ApiErrorResponse, ApiErrorType};
pub use json::Json;
