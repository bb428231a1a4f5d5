use async_trait::async_trait;
use std::fmt::Debug;

/// Maps text to a fixed-dimension vector.
///
/// Implementations must be deterministic (identical text, identical vector)
/// and total: every input yields a vector of `dimension()` length.
#[async_trait]
pub trait Embedder: Send + Sync + Debug {
    async fn embed(&self, text: &str) -> Vec<f32>;

    fn dimension(&self) -> usize;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;

    /// Returns preset vectors per text, zeros for anything else
    #[derive(Debug, Default)]
    pub struct FixedEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        dimension: usize,
    }

    impl FixedEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self {
                vectors: HashMap::new(),
                dimension,
            }
        }

        pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.into(), vector);
            self
        }
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> Vec<f32> {
            self.vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0; self.dimension])
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }
}
