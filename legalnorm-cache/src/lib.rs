//! Namespaced caching (C4): a filesystem-backed persistent cache shared
//! across components, plus an in-memory LRU variant for process-scoped
//! lookups.

pub mod memory;
pub mod persistent;
pub mod stats;

pub use memory::MemoryCache;
pub use persistent::PersistentCache;
pub use stats::CacheStats;

use async_trait::async_trait;

/// Common namespaced get/set contract (spec §4.4). `namespace` is one of
/// `normattiva`, `eurlex`, `brocardi`, `tree`, etc.; `key` is typically a
/// URN.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Option<serde_json::Value>;
    async fn set(&self, namespace: &str, key: &str, value: serde_json::Value);
    fn stats(&self) -> CacheStats;
}
