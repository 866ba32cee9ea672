use std::sync::atomic::{AtomicU64, Ordering};

/// Hit/miss/warmup counters exposed for `/health` (spec §4.4).
#[derive(Debug, Default)]
pub struct CacheStatsInner {
    hits: AtomicU64,
    misses: AtomicU64,
    warmups: AtomicU64,
}

impl CacheStatsInner {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warmup(&self) {
        self.warmups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let warmups = self.warmups.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 { 0.0 } else { hits as f64 / total as f64 };
        CacheStats {
            hits,
            misses,
            warmups,
            hit_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub warmups: u64,
    pub hit_rate: f64,
}
