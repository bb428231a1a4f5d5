//! Text embedding seam and vector/lexical similarity

mod embedder;
mod similarity;

pub use embedder::Embedder;
pub use similarity::{cosine_similarity, jaccard, token_set, tokenize};

#[cfg(test)]
pub use embedder::mock::FixedEmbedder;
