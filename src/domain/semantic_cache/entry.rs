use serde::{Deserialize, Serialize};

pub const DEFAULT_ENTRY_MODEL: &str = "gpt-4";

/// Bookkeeping attached to every cached answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub model: String,
    pub created_at_ms: i64,
    pub hit_count: u64,
    /// Similarity of the most recent hit; 1.0 when freshly stored
    pub confidence: f32,
    pub token_count: u32,
    pub cost_estimate: f64,
}

impl EntryMetadata {
    /// Elapsed-time check; an entry is stale once strictly older than `ttl_ms`
    pub fn is_expired(&self, now_ms: i64, ttl_ms: u64) -> bool {
        let ttl_ms = i64::try_from(ttl_ms).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.created_at_ms) > ttl_ms
    }
}

/// Caller-supplied metadata for `set`; missing fields take defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryOptions {
    pub model: Option<String>,
    pub confidence: Option<f32>,
    pub token_count: Option<u32>,
    pub cost_estimate: Option<f64>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_token_count(mut self, tokens: u32) -> Self {
        self.token_count = Some(tokens);
        self
    }

    pub fn with_cost_estimate(mut self, cost: f64) -> Self {
        self.cost_estimate = Some(cost);
        self
    }

    /// Fill defaults: model gpt-4, confidence 1.0, roughly four chars per token, no cost
    pub fn into_metadata(self, response: &str, created_at_ms: i64) -> EntryMetadata {
        EntryMetadata {
            model: self.model.unwrap_or_else(|| DEFAULT_ENTRY_MODEL.to_string()),
            created_at_ms,
            hit_count: 0,
            confidence: self.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
            token_count: self
                .token_count
                .unwrap_or((response.chars().count() / 4) as u32),
            cost_estimate: self.cost_estimate.unwrap_or(0.0),
        }
    }
}

/// A stored query/answer pair
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub query: String,
    pub embedding: Vec<f32>,
    pub response: String,
    pub metadata: EntryMetadata,
    /// Insertion sequence; breaks timestamp ties during eviction
    pub seq: u64,
}

/// Successful lookup; embedding omitted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheHit {
    pub key: String,
    pub query: String,
    pub response: String,
    pub metadata: EntryMetadata,
    pub similarity: f32,
}

impl CacheHit {
    pub fn from_entry(entry: &CacheEntry, similarity: f32) -> Self {
        Self {
            key: entry.key.clone(),
            query: entry.query.clone(),
            response: entry.response.clone(),
            metadata: entry.metadata.clone(),
            similarity,
        }
    }
}

/// Portable form of an entry; embeddings are recomputed on import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub key: String,
    pub query: String,
    pub response: String,
    pub metadata: EntryMetadata,
}

impl From<&CacheEntry> for ExportedEntry {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            query: entry.query.clone(),
            response: entry.response.clone(),
            metadata: entry.metadata.clone(),
        }
    }
}
