//! Semantic cache trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::{CacheHit, EntryOptions};
use crate::domain::DomainError;

/// A query and how often it was served from cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopQuery {
    pub query: String,
    pub hits: u64,
}

/// Statistics for the semantic cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticCacheStats {
    pub size: usize,
    pub total_hits: u64,
    /// Average entry confidence weighted by hit count
    pub average_confidence: f32,
    /// Σ cost_estimate × hit_count
    pub estimated_savings: f64,
    /// Up to ten most-hit queries
    pub top_queries: Vec<TopQuery>,
    pub misses: u64,
    pub evictions: u64,
}

impl SemanticCacheStats {
    pub fn hit_rate(&self) -> f32 {
        let total = self.total_hits + self.misses;

        if total == 0 {
            return 0.0;
        }

        self.total_hits as f32 / total as f32
    }
}

/// Similarity-keyed store of previous answers.
///
/// A miss is `Ok(None)`; errors are reserved for broken internal state.
#[async_trait]
pub trait SemanticCache: Send + Sync + Debug {
    /// Best cosine match over all live entries, if at or above the threshold
    async fn find_similar(&self, query: &str) -> Result<Option<CacheHit>, DomainError>;

    /// Candidates from the token index scored as 0.7·cosine + 0.3·jaccard
    async fn hybrid_search(&self, query: &str) -> Result<Option<CacheHit>, DomainError>;

    /// Store an answer, evicting a batch first when full; returns the entry key
    async fn set(
        &self,
        query: &str,
        response: &str,
        options: EntryOptions,
    ) -> Result<String, DomainError>;

    async fn stats(&self) -> Result<SemanticCacheStats, DomainError>;

    /// JSON array of entries without embeddings
    async fn export(&self) -> Result<String, DomainError>;

    /// Load entries produced by `export`, re-embedding each query; returns the count
    async fn import(&self, data: &str) -> Result<usize, DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;

    async fn len(&self) -> Result<usize, DomainError>;

    async fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len().await? == 0)
    }

    /// Eagerly drop every expired entry; returns how many were removed
    async fn cleanup_expired(&self) -> Result<usize, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = SemanticCacheStats {
            total_hits: 3,
            misses: 1,
            ..Default::default()
        };

        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert_eq!(SemanticCacheStats::default().hit_rate(), 0.0);
    }
}
