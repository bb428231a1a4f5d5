//! Chat-completion domain models and the provider adapter seam

mod message;
mod provider;
mod request;
mod response;

pub use message::{Message, MessageRole};
pub use provider::{ChunkStream, ProviderAdapter};
pub use request::{ChatRequest, ChatRequestBuilder, MAX_TEMPERATURE, MIN_TEMPERATURE};
pub use response::{ChatResponse, StreamChunk};

#[cfg(test)]
pub use provider::MockProviderAdapter;
#[cfg(test)]
pub use provider::mock::ScriptedAdapter;
