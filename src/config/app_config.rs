use serde::Deserialize;
use std::time::Duration;

use crate::domain::SemanticCacheConfig;
use crate::infrastructure::llm::{default_providers, ProviderSettings};
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::{DEFAULT_FALLBACK_MESSAGE, DEFAULT_FALLBACK_NAME};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub semantic_cache: SemanticCacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Provider routing and the last-resort answer
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_health_check_timeout_ms")]
    pub health_check_timeout_ms: u64,
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderSettings>,
    #[serde(default)]
    pub fallback: FallbackSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fallback_name")]
    pub name: String,
    #[serde(default = "default_fallback_message")]
    pub message: String,
}

fn default_health_check_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_fallback_name() -> String {
    DEFAULT_FALLBACK_NAME.to_string()
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            health_check_timeout_ms: default_health_check_timeout_ms(),
            providers: default_providers(),
            fallback: FallbackSettings::default(),
        }
    }
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_fallback_name(),
            message: default_fallback_message(),
        }
    }
}

impl GatewayConfig {
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }
}

impl AppConfig {
    /// Layered load: `config/default`, `config/local`, then `APP__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::ProviderKind;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.gateway.health_check_timeout(), Duration::from_secs(5));
        assert_eq!(config.gateway.providers.len(), 6);
        assert!(config.gateway.fallback.enabled);
        assert_eq!(config.semantic_cache.similarity_threshold, 0.95);
    }

    #[test]
    fn test_partial_sources_fill_defaults() {
        let source = config::Config::builder()
            .set_override("server.port", 9090)
            .unwrap()
            .set_override("logging.level", "debug")
            .unwrap()
            .set_override("semantic_cache.max_entries", 50)
            .unwrap()
            .build()
            .unwrap();

        let config: AppConfig = source.try_deserialize().unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.semantic_cache.max_entries, 50);
        assert_eq!(config.semantic_cache.ttl_ms, 3_600_000);
        assert_eq!(config.gateway.providers[0].id, "groq");
    }

    #[test]
    fn test_custom_provider_list() {
        let config: GatewayConfig = serde_json::from_value(serde_json::json!({
            "providers": [{
                "id": "local",
                "name": "Local vLLM",
                "kind": "open_ai",
                "priority": 10,
                "base_url": "http://localhost:8000/v1",
                "api_key_env": "LOCAL_LLM_KEY"
            }],
            "fallback": { "enabled": false }
        }))
        .unwrap();

        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].kind, ProviderKind::OpenAi);
        assert_eq!(config.health_check_timeout_ms, 5_000);
        assert!(!config.fallback.enabled);
        assert_eq!(config.fallback.message, DEFAULT_FALLBACK_MESSAGE);
    }
}
