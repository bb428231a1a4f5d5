use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// How a provider failure should be treated by the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rate limits, 5xx, dropped connections
    Transient,
    /// Bad credentials, malformed requests; retrying cannot help
    Fatal,
    /// The per-call deadline elapsed
    Timeout,
}

impl ErrorKind {
    /// Whether another attempt against the same provider is worthwhile
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Fatal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Fatal => write!(f, "fatal"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Failure reported by a provider adapter for a single call
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind} provider error: {message}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Classify a non-success HTTP status returned by a vendor
    pub fn from_status(status: u16, body: impl AsRef<str>) -> Self {
        let message = format!("HTTP {}: {}", status, body.as_ref());

        match status {
            408 => Self::timeout(message),
            429 => Self::transient(message),
            400..=499 => Self::fatal(message),
            _ => Self::transient(message),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Outcome of one provider inside an exhausted fallback chain
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderFailure {
    pub provider: String,
    pub attempts: u32,
    pub kind: ErrorKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, attempts: u32, error: &ProviderError) -> Self {
        Self {
            provider: provider.into(),
            attempts,
            kind: error.kind,
            message: error.message.clone(),
        }
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("All providers failed ({} attempted)", .failures.len())]
    AllProvidersFailed { failures: Vec<ProviderFailure> },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn all_providers_failed(failures: Vec<ProviderFailure>) -> Self {
        Self::AllProvidersFailed { failures }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when the whole fallback chain was exhausted
    pub fn is_all_providers_failed(&self) -> bool {
        matches!(self, Self::AllProvidersFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Invalid input");
        assert_eq!(error.to_string(), "Validation error: Invalid input");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(ProviderError::from_status(401, "bad key").kind, ErrorKind::Fatal);
        assert_eq!(ProviderError::from_status(404, "").kind, ErrorKind::Fatal);
        assert_eq!(ProviderError::from_status(429, "slow down").kind, ErrorKind::Transient);
        assert_eq!(ProviderError::from_status(503, "").kind, ErrorKind::Transient);
        assert_eq!(ProviderError::from_status(408, "").kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_fatal_is_not_retryable() {
        assert!(!ProviderError::fatal("nope").is_retryable());
        assert!(ProviderError::transient("again").is_retryable());
        assert!(ProviderError::timeout("slow").is_retryable());
    }

    #[test]
    fn test_all_providers_failed_message() {
        let failures = vec![
            ProviderFailure::new("Groq", 3, &ProviderError::transient("503")),
            ProviderFailure::new("OpenAI", 1, &ProviderError::fatal("401")),
        ];
        let error = DomainError::all_providers_failed(failures);

        assert!(error.is_all_providers_failed());
        assert_eq!(error.to_string(), "All providers failed (2 attempted)");
    }
}
