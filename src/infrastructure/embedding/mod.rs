//! Embedder implementations

mod hash;

pub use hash::{HashEmbedder, HASH_PREFIX_DIMS};
