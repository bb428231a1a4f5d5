use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::DomainError;

/// Static routing policy for one registered provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable identifier, e.g. "groq"
    pub id: String,
    /// Display name reported on responses, e.g. "Groq"
    pub name: String,
    /// Higher is preferred
    pub priority: i32,
    /// Total attempts allowed per request
    pub max_retries: u32,
    pub timeout_ms: u64,
    pub backoff_unit_ms: u64,
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority,
            max_retries: 3,
            timeout_ms: 30_000,
            backoff_unit_ms: 1_000,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_backoff_unit_ms(mut self, backoff_unit_ms: u64) -> Self {
        self.backoff_unit_ms = backoff_unit_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay after the given 1-based attempt has failed
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_unit_ms.saturating_mul(attempt as u64))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::configuration("provider id cannot be empty"));
        }

        if self.max_retries == 0 {
            return Err(DomainError::configuration(format!(
                "provider '{}' must allow at least one attempt",
                self.id
            )));
        }

        if self.timeout_ms == 0 {
            return Err(DomainError::configuration(format!(
                "provider '{}' timeout must be greater than 0",
                self.id
            )));
        }

        Ok(())
    }
}
