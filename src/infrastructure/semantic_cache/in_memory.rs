//! In-memory semantic cache with a token index for hybrid lookup

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use metrics::counter;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::embedding::{cosine_similarity, jaccard, token_set, Embedder};
use crate::domain::semantic_cache::{
    CacheEntry, CacheHit, Clock, EntryOptions, ExportedEntry, SemanticCache, SemanticCacheConfig,
    SemanticCacheStats, SystemClock, TopQuery,
};
use crate::domain::DomainError;

const VECTOR_WEIGHT: f32 = 0.7;
const LEXICAL_WEIGHT: f32 = 0.3;
const TOP_QUERIES: usize = 10;

/// Blended score, floored at the pure vector score so a lexical mismatch
/// never hides a candidate that `find_similar` would accept
fn hybrid_score(embedding: &[f32], tokens: &HashSet<String>, entry: &CacheEntry) -> f32 {
    let vector = cosine_similarity(embedding, &entry.embedding);
    let lexical = jaccard(tokens, &token_set(&entry.query));

    (VECTOR_WEIGHT * vector + LEXICAL_WEIGHT * lexical).max(vector)
}

/// Content-hash key for a query
pub fn cache_key(query: &str) -> String {
    hex::encode(Sha256::digest(query.as_bytes()))
}

/// Entries and token index, always mutated together under one lock
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    index: HashMap<String, HashSet<String>>,
    next_seq: u64,
}

impl CacheState {
    fn insert(&mut self, mut entry: CacheEntry) {
        self.remove(&entry.key);

        entry.seq = self.next_seq;
        self.next_seq += 1;

        for token in token_set(&entry.query) {
            self.index.entry(token).or_default().insert(entry.key.clone());
        }

        self.entries.insert(entry.key.clone(), entry);
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;

        for token in token_set(&entry.query) {
            if let Some(keys) = self.index.get_mut(&token) {
                keys.remove(key);

                if keys.is_empty() {
                    self.index.remove(&token);
                }
            }
        }

        Some(entry)
    }

    /// Remove the `count` oldest entries by creation time, insertion order on ties
    fn evict_oldest(&mut self, count: usize) -> usize {
        let mut by_age: Vec<(i64, u64, String)> = self
            .entries
            .values()
            .map(|e| (e.metadata.created_at_ms, e.seq, e.key.clone()))
            .collect();
        by_age.sort();

        by_age
            .into_iter()
            .take(count)
            .filter(|(_, _, key)| self.remove(key).is_some())
            .count()
    }

    fn expired_keys<'a>(
        &self,
        keys: impl Iterator<Item = &'a String>,
        now_ms: i64,
        ttl_ms: u64,
    ) -> Vec<String> {
        keys.filter(|key| {
            self.entries
                .get(*key)
                .is_some_and(|e| e.metadata.is_expired(now_ms, ttl_ms))
        })
        .cloned()
        .collect()
    }

    fn purge_expired(&mut self, now_ms: i64, ttl_ms: u64) -> usize {
        let expired = self.expired_keys(self.entries.keys(), now_ms, ttl_ms);
        let count = expired.len();

        for key in expired {
            self.remove(&key);
        }

        count
    }

    /// Keys sharing at least one token with the query, oldest insertion first
    fn candidates(&self, tokens: &HashSet<String>) -> Vec<String> {
        let mut keys: Vec<&String> = tokens
            .iter()
            .filter_map(|t| self.index.get(t))
            .flatten()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        keys.sort_by_key(|k| self.entries.get(*k).map(|e| e.seq).unwrap_or(u64::MAX));
        keys.into_iter().cloned().collect()
    }

    /// Highest score over `keys`; earlier insertion wins ties
    fn best_match<F>(&self, keys: &[String], score: F) -> Option<(String, f32)>
    where
        F: Fn(&CacheEntry) -> f32,
    {
        keys.iter()
            .filter_map(|key| self.entries.get(key).map(|e| (key, score(e))))
            .fold(None, |best: Option<(&String, f32)>, (key, s)| match best {
                Some((_, best_score)) if best_score.partial_cmp(&s) != Some(CmpOrdering::Less) => {
                    best
                }
                _ => Some((key, s)),
            })
            .map(|(key, s)| (key.clone(), s))
    }

    fn keys_by_seq(&self) -> Vec<String> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.key.clone()).collect()
    }

    fn record_hit(&mut self, key: &str, similarity: f32) -> Option<CacheHit> {
        let entry = self.entries.get_mut(key)?;
        entry.metadata.hit_count += 1;
        entry.metadata.confidence = similarity.clamp(0.0, 1.0);

        Some(CacheHit::from_entry(entry, similarity))
    }
}

/// In-memory semantic cache
///
/// Lookups are linear in the number of live entries (or candidates, for
/// hybrid search). Embeddings are computed before the lock is taken.
#[derive(Debug)]
pub struct InMemorySemanticCache {
    config: SemanticCacheConfig,
    embedder: Arc<dyn Embedder>,
    clock: Arc<dyn Clock>,
    state: RwLock<CacheState>,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemorySemanticCache {
    pub fn new(config: SemanticCacheConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            embedder,
            clock: Arc::new(SystemClock),
            state: RwLock::new(CacheState::default()),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Like `new`, but rejects an embedder whose vectors do not match `embedding_dim`
    pub fn try_new(
        config: SemanticCacheConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, DomainError> {
        if embedder.dimension() != config.embedding_dim {
            return Err(DomainError::configuration(format!(
                "embedder {} produces {}-dimensional vectors, semantic_cache.embedding_dim is {}",
                embedder.name(),
                embedder.dimension(),
                config.embedding_dim
            )));
        }

        Ok(Self::new(config, embedder))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, CacheState>, DomainError> {
        self.state
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, CacheState>, DomainError> {
        self.state
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    /// Evict a batch when a new key would exceed capacity
    fn make_room(&self, state: &mut CacheState, key: &str) {
        if state.entries.contains_key(key) || state.entries.len() < self.config.max_entries {
            return;
        }

        let evicted = state.evict_oldest(self.config.eviction_batch());
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        counter!("semantic_cache_evictions_total").increment(evicted as u64);

        debug!(evicted, remaining = state.entries.len(), "Evicted oldest cache entries");
    }

    fn record_outcome(&self, lookup: &'static str, hit: &Option<CacheHit>) {
        match hit {
            Some(hit) => {
                counter!("semantic_cache_hits_total", "lookup" => lookup).increment(1);
                debug!(lookup, similarity = hit.similarity, key = %hit.key, "Semantic cache hit");
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                counter!("semantic_cache_misses_total", "lookup" => lookup).increment(1);
                debug!(lookup, "Semantic cache miss");
            }
        }
    }

    /// Vector-only lookup over every live entry; caller holds the lock
    fn vector_lookup(&self, state: &mut CacheState, embedding: &[f32]) -> Option<CacheHit> {
        state.purge_expired(self.clock.now_ms(), self.config.ttl_ms);

        let keys = state.keys_by_seq();
        let (key, similarity) =
            state.best_match(&keys, |entry| cosine_similarity(embedding, &entry.embedding))?;

        if similarity < self.config.similarity_threshold {
            return None;
        }

        state.record_hit(&key, similarity)
    }
}

#[async_trait]
impl SemanticCache for InMemorySemanticCache {
    async fn find_similar(&self, query: &str) -> Result<Option<CacheHit>, DomainError> {
        let embedding = self.embedder.embed(query).await;

        let hit = {
            let mut state = self.write_state()?;
            self.vector_lookup(&mut state, &embedding)
        };

        self.record_outcome("vector", &hit);
        Ok(hit)
    }

    async fn hybrid_search(&self, query: &str) -> Result<Option<CacheHit>, DomainError> {
        let tokens = token_set(query);
        let embedding = self.embedder.embed(query).await;

        let (hit, lookup) = {
            let mut state = self.write_state()?;

            let candidates = state.candidates(&tokens);
            let expired =
                state.expired_keys(candidates.iter(), self.clock.now_ms(), self.config.ttl_ms);
            for key in &expired {
                state.remove(key);
            }

            let candidates: Vec<String> = candidates
                .into_iter()
                .filter(|k| !expired.contains(k))
                .collect();

            if candidates.is_empty() {
                (self.vector_lookup(&mut state, &embedding), "vector")
            } else {
                let best = state.best_match(&candidates, |entry| {
                    hybrid_score(&embedding, &tokens, entry)
                });

                let hit = match best {
                    Some((key, score)) if score >= self.config.similarity_threshold => {
                        state.record_hit(&key, score)
                    }
                    _ => None,
                };

                (hit, "hybrid")
            }
        };

        self.record_outcome(lookup, &hit);
        Ok(hit)
    }

    async fn set(
        &self,
        query: &str,
        response: &str,
        options: EntryOptions,
    ) -> Result<String, DomainError> {
        let embedding = self.embedder.embed(query).await;
        let key = cache_key(query);
        let metadata = options.into_metadata(response, self.clock.now_ms());

        let mut state = self.write_state()?;
        self.make_room(&mut state, &key);

        state.insert(CacheEntry {
            key: key.clone(),
            query: query.to_string(),
            embedding,
            response: response.to_string(),
            metadata,
            seq: 0,
        });

        debug!(key = %key, size = state.entries.len(), "Stored semantic cache entry");
        Ok(key)
    }

    async fn stats(&self) -> Result<SemanticCacheStats, DomainError> {
        let now_ms = self.clock.now_ms();
        let state = self.read_state()?;

        let mut live: Vec<&CacheEntry> = state
            .entries
            .values()
            .filter(|e| !e.metadata.is_expired(now_ms, self.config.ttl_ms))
            .collect();

        let total_hits: u64 = live.iter().map(|e| e.metadata.hit_count).sum();
        let weighted_confidence: f64 = live
            .iter()
            .map(|e| e.metadata.confidence as f64 * e.metadata.hit_count as f64)
            .sum();
        let estimated_savings: f64 = live
            .iter()
            .map(|e| e.metadata.cost_estimate * e.metadata.hit_count as f64)
            .sum();

        let average_confidence = if total_hits == 0 {
            0.0
        } else {
            (weighted_confidence / total_hits as f64) as f32
        };

        live.sort_by(|a, b| {
            b.metadata
                .hit_count
                .cmp(&a.metadata.hit_count)
                .then(a.seq.cmp(&b.seq))
        });

        let top_queries = live
            .iter()
            .take(TOP_QUERIES)
            .map(|e| TopQuery {
                query: e.query.clone(),
                hits: e.metadata.hit_count,
            })
            .collect();

        Ok(SemanticCacheStats {
            size: live.len(),
            total_hits,
            average_confidence,
            estimated_savings,
            top_queries,
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }

    async fn export(&self) -> Result<String, DomainError> {
        let now_ms = self.clock.now_ms();
        let state = self.read_state()?;

        let mut entries: Vec<&CacheEntry> = state
            .entries
            .values()
            .filter(|e| !e.metadata.is_expired(now_ms, self.config.ttl_ms))
            .collect();
        entries.sort_by_key(|e| e.seq);

        let exported: Vec<ExportedEntry> = entries.into_iter().map(ExportedEntry::from).collect();

        serde_json::to_string_pretty(&exported)
            .map_err(|e| DomainError::serialization(format!("Failed to export cache: {}", e)))
    }

    async fn import(&self, data: &str) -> Result<usize, DomainError> {
        let exported: Vec<ExportedEntry> = serde_json::from_str(data)
            .map_err(|e| DomainError::serialization(format!("Invalid cache export: {}", e)))?;

        let mut prepared = Vec::with_capacity(exported.len());
        for item in exported {
            let embedding = self.embedder.embed(&item.query).await;
            prepared.push((item, embedding));
        }

        let mut state = self.write_state()?;
        let count = prepared.len();

        for (item, embedding) in prepared {
            let key = cache_key(&item.query);
            self.make_room(&mut state, &key);

            state.insert(CacheEntry {
                key,
                query: item.query,
                embedding,
                response: item.response,
                metadata: item.metadata,
                seq: 0,
            });
        }

        debug!(count, size = state.entries.len(), "Imported semantic cache entries");
        Ok(count)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut state = self.write_state()?;
        *state = CacheState::default();

        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);

        Ok(())
    }

    async fn len(&self) -> Result<usize, DomainError> {
        Ok(self.read_state()?.entries.len())
    }

    async fn cleanup_expired(&self) -> Result<usize, DomainError> {
        let now_ms = self.clock.now_ms();
        let mut state = self.write_state()?;

        Ok(state.purge_expired(now_ms, self.config.ttl_ms))
    }
}
