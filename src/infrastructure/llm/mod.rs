//! LLM provider implementations

mod anthropic;
mod cohere;
mod factory;
mod google;
mod http_client;
mod openai;

pub use anthropic::{AnthropicAdapter, DEFAULT_ANTHROPIC_BASE_URL};
pub use cohere::{CohereAdapter, DEFAULT_COHERE_BASE_URL};
pub use factory::{default_providers, ProviderFactory, ProviderKind, ProviderSettings};
pub use google::{GoogleAdapter, DEFAULT_GOOGLE_BASE_URL};
pub use http_client::{
    json_values, sse_data, ByteStream, HttpClient, HttpClientTrait, JsonStream, SseStream,
};
pub use openai::{OpenAiCompatibleAdapter, DEFAULT_OPENAI_BASE_URL};
