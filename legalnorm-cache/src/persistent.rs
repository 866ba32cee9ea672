//! Filesystem-backed namespaced cache (spec §4.4).
//!
//! Layout: `{base_dir}/{namespace}/{sha256(key)}.json`, content
//! `{"timestamp": <unix-secs>, "data": <value>}`. Expiry is lazy: a read
//! past TTL deletes the entry and reports a miss. Writes are atomic at
//! the entry level via write-to-temp-then-rename; no cross-entry lock.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::stats::{CacheStats, CacheStatsInner};
use crate::Cache;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    timestamp: i64,
    data: serde_json::Value,
}

pub struct PersistentCache {
    base_dir: PathBuf,
    ttl_secs: i64,
    stats: CacheStatsInner,
}

impl PersistentCache {
    pub fn new(base_dir: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            ttl_secs: ttl_secs as i64,
            stats: CacheStatsInner::default(),
        }
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        self.base_dir.join(namespace).join(format!("{digest:x}.json"))
    }

    async fn ensure_namespace_dir(&self, namespace: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.base_dir.join(namespace)).await
    }
}

#[async_trait]
impl Cache for PersistentCache {
    async fn get(&self, namespace: &str, key: &str) -> Option<serde_json::Value> {
        let path = self.entry_path(namespace, key);
        let raw = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                self.stats.record_miss();
                return None;
            }
        };
        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(e) => e,
            Err(e) => {
                warn!(namespace, key, error = %e, "corrupt cache entry, treating as miss");
                self.stats.record_miss();
                return None;
            }
        };
        if Utc::now().timestamp() - envelope.timestamp > self.ttl_secs {
            let _ = tokio::fs::remove_file(&path).await;
            self.stats.record_miss();
            return None;
        }
        self.stats.record_hit();
        Some(envelope.data)
    }

    async fn set(&self, namespace: &str, key: &str, value: serde_json::Value) {
        if let Err(e) = self.ensure_namespace_dir(namespace).await {
            warn!(namespace, error = %e, "failed to create cache namespace directory");
            return;
        }
        let path = self.entry_path(namespace, key);
        let envelope = Envelope {
            timestamp: Utc::now().timestamp(),
            data: value,
        };
        let body = match serde_json::to_vec(&envelope) {
            Ok(b) => b,
            Err(e) => {
                warn!(namespace, key, error = %e, "failed to serialize cache entry");
                return;
            }
        };
        let tmp_path = tmp_path_for(&path);
        if let Err(e) = tokio::fs::write(&tmp_path, &body).await {
            warn!(namespace, key, error = %e, "failed to write cache entry");
            return;
        }
        // Last writer wins on concurrent sets for the same key (spec §4.4
        // concurrency model); rename is the atomicity boundary.
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            warn!(namespace, key, error = %e, "failed to commit cache entry");
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(dir.path(), 3600);
        cache.set("normattiva", "urn:foo", json!({"text": "hello"})).await;
        let got = cache.get("normattiva", "urn:foo").await;
        assert_eq!(got, Some(json!({"text": "hello"})));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(dir.path(), 3600);
        assert_eq!(cache.get("normattiva", "absent").await, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_deleted_and_reported_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(dir.path(), 0);
        cache.set("tree", "urn:bar", json!(42)).await;
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert_eq!(cache.get("tree", "urn:bar").await, None);
    }

    #[tokio::test]
    async fn different_namespaces_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::new(dir.path(), 3600);
        cache.set("normattiva", "same-key", json!(1)).await;
        cache.set("eurlex", "same-key", json!(2)).await;
        assert_eq!(cache.get("normattiva", "same-key").await, Some(json!(1)));
        assert_eq!(cache.get("eurlex", "same-key").await, Some(json!(2)));
    }
}
