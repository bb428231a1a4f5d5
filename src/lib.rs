//! PMP LLM Relay
//!
//! A resilient chat gateway in front of several LLM providers:
//! - Health-probed, priority-ordered provider fallback with retries
//! - Streaming with mid-stream failover
//! - Semantic cache keyed by embedding similarity
//! - OpenAI-compatible HTTP API

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::{embedding::Embedder, HealthProber};
use infrastructure::{
    credentials::CredentialSource,
    embedding::HashEmbedder,
    llm::ProviderFactory,
    semantic_cache::InMemorySemanticCache,
    services::{ChatGatewayService, StaticFallbackResponder},
};
use tracing::info;

/// Wire the registry, prober, cache and gateway from configuration
pub fn build_app_state(
    config: &AppConfig,
    credentials: &dyn CredentialSource,
) -> anyhow::Result<AppState> {
    let registry = ProviderFactory::build_registry(&config.gateway.providers, credentials)?;
    let available = registry.available().len();

    let prober = HealthProber::new(Arc::new(registry))
        .with_probe_timeout(config.gateway.health_check_timeout());

    let cache_config = config.semantic_cache.clone();
    cache_config.validate()?;
    let min_confidence = cache_config.min_confidence_for_reuse;
    let embedder = Arc::new(HashEmbedder::new(cache_config.embedding_dim));
    let embedder_name = embedder.name();
    let cache = Arc::new(InMemorySemanticCache::try_new(cache_config, embedder)?);

    let mut gateway = ChatGatewayService::new(prober, cache, min_confidence);

    let fallback = &config.gateway.fallback;
    if fallback.enabled {
        gateway = gateway.with_fallback(Arc::new(StaticFallbackResponder::new(
            &fallback.name,
            &fallback.message,
        )));
    }

    info!(
        providers = config.gateway.providers.len(),
        available,
        fallback = fallback.enabled,
        embedder = embedder_name,
        "Application state initialized"
    );

    Ok(AppState::new(gateway))
}
