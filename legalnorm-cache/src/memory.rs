//! In-memory, process-scoped LRU cache (spec §4.4, §5).
//!
//! Used for act-type normalization, date completion, reference→URN and
//! tree results — bounded size, LRU eviction, a single mutex guarding
//! both reads and writes (spec §5 "Shared mutable state and its
//! discipline").

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use crate::stats::{CacheStats, CacheStatsInner};
use crate::Cache;

struct Inner {
    entries: HashMap<String, serde_json::Value>,
    order: VecDeque<String>,
}

fn namespaced(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

pub struct MemoryCache {
    inner: Mutex<Inner>,
    max_size: usize,
    stats: CacheStatsInner,
}

impl MemoryCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_size,
            stats: CacheStatsInner::default(),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, namespace: &str, key: &str) -> Option<serde_json::Value> {
        let full_key = namespaced(namespace, key);
        let mut guard = self.inner.lock().await;
        if let Some(value) = guard.entries.get(&full_key).cloned() {
            guard.order.retain(|k| k != &full_key);
            guard.order.push_back(full_key);
            self.stats.record_hit();
            Some(value)
        } else {
            self.stats.record_miss();
            None
        }
    }

    async fn set(&self, namespace: &str, key: &str, value: serde_json::Value) {
        let full_key = namespaced(namespace, key);
        let mut guard = self.inner.lock().await;
        if guard.entries.insert(full_key.clone(), value).is_none() {
            guard.order.push_back(full_key);
        }
        while guard.entries.len() > self.max_size {
            if let Some(oldest) = guard.order.pop_front() {
                guard.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        cache.set("urn", "a", json!(1)).await;
        cache.set("urn", "b", json!(2)).await;
        cache.set("urn", "c", json!(3)).await;
        assert_eq!(cache.get("urn", "a").await, None);
        assert_eq!(cache.get("urn", "b").await, Some(json!(2)));
        assert_eq!(cache.get("urn", "c").await, Some(json!(3)));
    }

    #[tokio::test]
    async fn get_refreshes_recency() {
        let cache = MemoryCache::new(2);
        cache.set("urn", "a", json!(1)).await;
        cache.set("urn", "b", json!(2)).await;
        cache.get("urn", "a").await;
        cache.set("urn", "c", json!(3)).await;
        // "b" was least recently used after "a" was touched, so it's evicted.
        assert_eq!(cache.get("urn", "b").await, None);
        assert_eq!(cache.get("urn", "a").await, Some(json!(1)));
    }
}
