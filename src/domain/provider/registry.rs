use std::fmt;
use std::sync::Arc;

use super::ProviderConfig;
use crate::domain::llm::ProviderAdapter;
use crate::domain::DomainError;

/// A provider that has both a routing policy and a live client
#[derive(Clone)]
pub struct ProviderHandle {
    pub config: Arc<ProviderConfig>,
    pub client: Arc<dyn ProviderAdapter>,
}

impl ProviderHandle {
    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn priority(&self) -> i32 {
        self.config.priority
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("id", &self.config.id)
            .field("vendor", &self.client.vendor())
            .finish()
    }
}

/// Registry slot; the client is absent when no credentials were available
#[derive(Clone)]
pub struct RegisteredProvider {
    config: Arc<ProviderConfig>,
    client: Option<Arc<dyn ProviderAdapter>>,
}

impl RegisteredProvider {
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn handle(&self) -> Option<ProviderHandle> {
        self.client.as_ref().map(|client| ProviderHandle {
            config: self.config.clone(),
            client: client.clone(),
        })
    }
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("config", &self.config)
            .field("has_client", &self.has_client())
            .finish()
    }
}

/// Providers in registration order, built once at startup and shared by `Arc`
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        config: ProviderConfig,
        client: Option<Arc<dyn ProviderAdapter>>,
    ) -> Result<(), DomainError> {
        config.validate()?;

        if self.get(&config.id).is_some() {
            return Err(DomainError::configuration(format!(
                "provider '{}' is already registered",
                config.id
            )));
        }

        self.providers.push(RegisteredProvider {
            config: Arc::new(config),
            client,
        });

        Ok(())
    }

    /// Builder-style registration for tests and static setups
    pub fn with_provider(
        mut self,
        config: ProviderConfig,
        client: Option<Arc<dyn ProviderAdapter>>,
    ) -> Result<Self, DomainError> {
        self.register(config, client)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredProvider> {
        self.providers.iter().find(|p| p.config.id == id)
    }

    pub fn entries(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    /// Providers with a client, in registration order
    pub fn available(&self) -> Vec<ProviderHandle> {
        self.providers.iter().filter_map(|p| p.handle()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ScriptedAdapter;

    fn client() -> Option<Arc<dyn ProviderAdapter>> {
        Some(Arc::new(ScriptedAdapter::new("ok")))
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(ProviderConfig::new("groq", "Groq", 9), client())
            .unwrap();

        let result = registry.register(ProviderConfig::new("groq", "Groq 2", 1), client());
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_available_skips_missing_clients() {
        let registry = ProviderRegistry::new()
            .with_provider(ProviderConfig::new("groq", "Groq", 9), None)
            .unwrap()
            .with_provider(ProviderConfig::new("openai", "OpenAI", 8), client())
            .unwrap()
            .with_provider(ProviderConfig::new("together", "Together AI", 7), client())
            .unwrap();

        let ids: Vec<_> = registry
            .available()
            .iter()
            .map(|h| h.id().to_string())
            .collect();

        assert_eq!(ids, vec!["openai", "together"]);
        assert!(!registry.get("groq").unwrap().has_client());
    }
}
