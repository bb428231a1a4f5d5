//! Infrastructure layer - External service implementations

pub mod credentials;
pub mod embedding;
pub mod llm;
pub mod observability;
pub mod semantic_cache;
pub mod services;
