//! Domain layer - Core business logic and entities

pub mod embedding;
pub mod error;
pub mod llm;
pub mod orchestration;
pub mod provider;
pub mod semantic_cache;
pub mod usage;

pub use error::{DomainError, ErrorKind, ProviderError, ProviderFailure};
pub use llm::{
    ChatRequest, ChatRequestBuilder, ChatResponse, ChunkStream, Message, MessageRole,
    ProviderAdapter, StreamChunk,
};
pub use orchestration::{
    score_confidence, ChatStream, FallbackExecutor, FallbackResponder, HealthProber, ProbeOutcome,
    ProbeStatus, StreamingMultiplexer,
};
pub use provider::{ProviderConfig, ProviderHandle, ProviderRegistry};
pub use semantic_cache::{
    CacheHit, EntryOptions, SemanticCache, SemanticCacheConfig, SemanticCacheStats,
};
