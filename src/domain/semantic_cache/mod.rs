//! Semantic cache domain models and traits
//!
//! Maps near-duplicate queries to previously computed answers using
//! vector similarity, optionally narrowed by a lexical token index.

mod clock;
mod config;
mod entry;
mod repository;

pub use clock::{Clock, SystemClock};
pub use config::SemanticCacheConfig;
pub use entry::{
    CacheEntry, CacheHit, EntryMetadata, EntryOptions, ExportedEntry, DEFAULT_ENTRY_MODEL,
};
pub use repository::{SemanticCache, SemanticCacheStats, TopQuery};

#[cfg(test)]
pub use clock::mock::ManualClock;
