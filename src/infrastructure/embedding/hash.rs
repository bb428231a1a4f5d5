//! Deterministic hash-derived pseudo-embeddings
//!
//! Not a semantic model: only identical or near-identical text lands close
//! together. Swap in a real `Embedder` to recognise paraphrases.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::embedding::Embedder;

/// Dimensions filled from the whole-text digest
pub const HASH_PREFIX_DIMS: usize = 32;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Sync form of `embed`
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let digest = Sha256::digest(text.as_bytes());
        for (slot, byte) in vector.iter_mut().zip(digest.iter()).take(HASH_PREFIX_DIMS) {
            *slot = (*byte as f32 - 128.0) / 128.0;
        }

        let lowered = text.to_lowercase();
        for (slot, word) in vector.iter_mut().zip(lowered.split_whitespace()) {
            let word_digest = Sha256::digest(word.as_bytes());
            *slot += (word_digest[0] as f32 - 128.0) / 256.0;
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(1536)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        self.embed_text(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "sha256-hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let embedder = HashEmbedder::default();

        let a = embedder.embed("What is your pricing?").await;
        let b = embedder.embed("What is your pricing?").await;

        assert_eq!(a, b);
        assert_eq!(a.len(), 1536);
    }

    #[test]
    fn test_tail_is_zero() {
        let vector = HashEmbedder::new(64).embed_text("one two");

        assert!(vector[HASH_PREFIX_DIMS..].iter().all(|v| *v == 0.0));
        assert!(vector[..HASH_PREFIX_DIMS].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_small_dimension_is_total() {
        let vector = HashEmbedder::new(4).embed_text("a b c d e f g");
        assert_eq!(vector.len(), 4);
    }

    #[test]
    fn test_different_text_is_dissimilar() {
        let embedder = HashEmbedder::default();
        let pricing = embedder.embed_text("What is your pricing?");
        let weather = embedder.embed_text("What's the weather?");

        assert!(cosine_similarity(&pricing, &weather) < 0.95);
        assert!((cosine_similarity(&pricing, &pricing) - 1.0).abs() < 1e-5);
    }
}
