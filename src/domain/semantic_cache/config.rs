//! Semantic cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Configuration for semantic caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Minimum similarity for a hit, in (0, 1]
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Maximum number of entries to store
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Entry lifetime in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Length of every embedding vector
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// A cached answer is only served above this confidence
    #[serde(default = "default_min_confidence_for_reuse")]
    pub min_confidence_for_reuse: f32,
}

fn default_similarity_threshold() -> f32 {
    0.95
}

fn default_max_entries() -> usize {
    10000
}

fn default_ttl_ms() -> u64 {
    3_600_000
}

fn default_embedding_dim() -> usize {
    1536
}

fn default_min_confidence_for_reuse() -> f32 {
    0.92
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_entries: default_max_entries(),
            ttl_ms: default_ttl_ms(),
            embedding_dim: default_embedding_dim(),
            min_confidence_for_reuse: default_min_confidence_for_reuse(),
        }
    }
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_min_confidence_for_reuse(mut self, confidence: f32) -> Self {
        self.min_confidence_for_reuse = confidence;
        self
    }

    /// Number of entries removed by one capacity eviction pass
    pub fn eviction_batch(&self) -> usize {
        (self.max_entries / 10).max(1)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(DomainError::configuration(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if self.max_entries == 0 {
            return Err(DomainError::configuration("max_entries must be greater than 0"));
        }

        if self.embedding_dim == 0 {
            return Err(DomainError::configuration("embedding_dim must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.min_confidence_for_reuse) {
            return Err(DomainError::configuration(
                "min_confidence_for_reuse must be in [0, 1]",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SemanticCacheConfig::default();

        assert!((config.similarity_threshold - 0.95).abs() < 0.01);
        assert_eq!(config.max_entries, 10000);
        assert_eq!(config.ttl(), Duration::from_secs(3600));
        assert_eq!(config.embedding_dim, 1536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_eviction_batch() {
        assert_eq!(SemanticCacheConfig::new().eviction_batch(), 1000);
        assert_eq!(SemanticCacheConfig::new().with_max_entries(5).eviction_batch(), 1);
    }

    #[test]
    fn test_with_ttl_saturates() {
        assert_eq!(SemanticCacheConfig::new().with_ttl(Duration::from_secs(2)).ttl_ms, 2_000);
        assert_eq!(SemanticCacheConfig::new().with_ttl(Duration::MAX).ttl_ms, u64::MAX);
    }

    #[test]
    fn test_validate_threshold_bounds() {
        assert!(SemanticCacheConfig::new().with_similarity_threshold(0.0).validate().is_err());
        assert!(SemanticCacheConfig::new().with_similarity_threshold(1.0).validate().is_ok());
        assert!(SemanticCacheConfig::new().with_similarity_threshold(1.2).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SemanticCacheConfig =
            serde_json::from_str(r#"{"max_entries": 50, "ttl_ms": 1000}"#).unwrap();

        assert_eq!(config.max_entries, 50);
        assert_eq!(config.ttl_ms, 1000);
        assert_eq!(config.embedding_dim, 1536);
    }
}
