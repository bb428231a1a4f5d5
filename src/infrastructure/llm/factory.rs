use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::anthropic::{AnthropicAdapter, DEFAULT_ANTHROPIC_BASE_URL};
use super::cohere::{CohereAdapter, DEFAULT_COHERE_BASE_URL};
use super::google::{GoogleAdapter, DEFAULT_GOOGLE_BASE_URL};
use super::http_client::HttpClient;
use super::openai::{OpenAiCompatibleAdapter, DEFAULT_OPENAI_BASE_URL};
use crate::domain::{DomainError, ProviderAdapter, ProviderConfig, ProviderRegistry};
use crate::infrastructure::credentials::CredentialSource;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";

/// Wire protocol and vendor defaults for a configured provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Groq,
    Together,
    Anthropic,
    Google,
    Cohere,
}

impl ProviderKind {
    pub fn vendor(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Together => "together",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Cohere => "cohere",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_BASE_URL,
            Self::Groq => GROQ_BASE_URL,
            Self::Together => TOGETHER_BASE_URL,
            Self::Anthropic => DEFAULT_ANTHROPIC_BASE_URL,
            Self::Google => DEFAULT_GOOGLE_BASE_URL,
            Self::Cohere => DEFAULT_COHERE_BASE_URL,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4-turbo-preview",
            Self::Groq => "mixtral-8x7b-32768",
            Self::Together => "mistralai/Mixtral-8x7B-Instruct-v0.1",
            Self::Anthropic => "claude-3-sonnet-20240229",
            Self::Google => "gemini-pro",
            Self::Cohere => "command",
        }
    }
}

/// One entry of `gateway.providers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub id: String,
    pub name: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    pub api_key_env: String,
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_backoff_unit_ms() -> u64 {
    1_000
}

impl ProviderSettings {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ProviderKind,
        priority: i32,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            priority,
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            backoff_unit_ms: default_backoff_unit_ms(),
            base_url: None,
            default_model: None,
            api_key_env: api_key_env.into(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_backoff_unit_ms(mut self, backoff_unit_ms: u64) -> Self {
        self.backoff_unit_ms = backoff_unit_ms;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
    }

    pub fn default_model(&self) -> &str {
        self.default_model
            .as_deref()
            .unwrap_or_else(|| self.kind.default_model())
    }

    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(self.id.clone(), self.name.clone(), self.priority)
            .with_max_retries(self.max_retries)
            .with_timeout_ms(self.timeout_ms)
            .with_backoff_unit_ms(self.backoff_unit_ms)
    }
}

/// The hosted vendors with their stock routing policy
pub fn default_providers() -> Vec<ProviderSettings> {
    vec![
        ProviderSettings::new("groq", "Groq", ProviderKind::Groq, 9, "GROQ_API_KEY")
            .with_timeout_ms(30_000)
            .with_backoff_unit_ms(1_000),
        ProviderSettings::new("openai", "OpenAI", ProviderKind::OpenAi, 8, "OPENAI_API_KEY")
            .with_timeout_ms(60_000)
            .with_backoff_unit_ms(2_000),
        ProviderSettings::new(
            "anthropic",
            "Anthropic",
            ProviderKind::Anthropic,
            8,
            "ANTHROPIC_API_KEY",
        )
        .with_timeout_ms(60_000)
        .with_backoff_unit_ms(1_500),
        ProviderSettings::new(
            "together",
            "Together AI",
            ProviderKind::Together,
            7,
            "TOGETHER_API_KEY",
        )
        .with_timeout_ms(45_000)
        .with_backoff_unit_ms(1_000),
        ProviderSettings::new("google", "Google AI", ProviderKind::Google, 7, "GOOGLE_API_KEY")
            .with_timeout_ms(45_000)
            .with_backoff_unit_ms(1_000),
        ProviderSettings::new("cohere", "Cohere", ProviderKind::Cohere, 6, "COHERE_API_KEY")
            .with_timeout_ms(45_000)
            .with_backoff_unit_ms(1_500),
    ]
}

/// Factory for provider adapters
#[derive(Debug)]
pub struct ProviderFactory;

impl ProviderFactory {
    /// Build an adapter for `settings` authenticated with `api_key`
    pub fn create(settings: &ProviderSettings, api_key: &str) -> Arc<dyn ProviderAdapter> {
        let http_client = HttpClient::new();

        match settings.kind {
            ProviderKind::Anthropic => Arc::new(AnthropicAdapter::with_base_url(
                http_client,
                api_key,
                settings.default_model(),
                settings.base_url(),
            )),
            ProviderKind::Google => Arc::new(GoogleAdapter::with_base_url(
                http_client,
                api_key,
                settings.default_model(),
                settings.base_url(),
            )),
            ProviderKind::Cohere => Arc::new(CohereAdapter::with_base_url(
                http_client,
                api_key,
                settings.default_model(),
                settings.base_url(),
            )),
            kind => Arc::new(OpenAiCompatibleAdapter::with_base_url(
                http_client,
                kind.vendor(),
                api_key,
                settings.default_model(),
                settings.base_url(),
            )),
        }
    }

    /// Register every configured provider; those without a usable key get no client
    pub fn build_registry(
        providers: &[ProviderSettings],
        credentials: &dyn CredentialSource,
    ) -> Result<ProviderRegistry, DomainError> {
        let mut registry = ProviderRegistry::new();

        for settings in providers {
            let client = match credentials.api_key(&settings.api_key_env) {
                Some(key) => {
                    info!(provider = %settings.id, vendor = settings.kind.vendor(), "Provider client configured");
                    Some(Self::create(settings, &key))
                }
                None => {
                    warn!(
                        provider = %settings.id,
                        env = %settings.api_key_env,
                        "No valid API key, provider registered without client"
                    );
                    None
                }
            };

            registry.register(settings.to_provider_config(), client)?;
        }

        Ok(registry)
    }
}
