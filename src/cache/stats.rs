use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for a cache. Updated with relaxed atomics; the numbers
/// are for observability, not for coordination.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    trimmed: AtomicU64,
    expired: AtomicU64,
    cleared: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_trimmed(&self, n: u64) {
        self.trimmed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_expired(&self, n: u64) {
        self.expired.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_cleared(&self) {
        self.cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entries: usize) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            entries,
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            inserts: self.inserts.load(Ordering::Relaxed),
            trimmed: self.trimmed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            cleared: self.cleared.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CacheStats`], serializable for the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)` as a percentage; 0 before any lookup.
    pub hit_rate: f64,
    pub inserts: u64,
    /// Turns dropped from the front of a window to honor the size cap.
    pub trimmed: u64,
    pub expired: u64,
    pub cleared: u64,
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits.saturating_add(misses);
    if total == 0 {
        0.0
    } else {
        (hits as f64 / total as f64) * 100.0
    }
}
