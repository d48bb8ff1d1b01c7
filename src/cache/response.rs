use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::clock::Clock;
use super::entry::{CacheEntry, ttl_from_secs};
use super::stats::{CacheStats, CacheStatsSnapshot};
use super::sweeper::Sweep;
use crate::config::CacheConfig;
use crate::emotion::Emotion;
use crate::persona::Personality;

/// A previously generated reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedReply {
    pub text: String,
    pub emotion: Emotion,
    pub tokens: u32,
}

/// Short-lived cache of replies keyed by personality and normalized message,
/// so an identical prompt within the TTL skips the model call.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry<CachedReply>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            stats: CacheStats::new(),
        }
    }

    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(ttl_from_secs(config.response_ttl_secs), clock)
    }

    /// SHA-256 of `personality|message`, message trimmed and lowercased.
    pub fn key_for(personality: Personality, message: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(personality.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(message.trim().to_lowercase().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<CachedReply> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.stats.inc_hit();
                Some(entry.data().clone())
            }
            _ => {
                self.stats.inc_miss();
                None
            }
        }
    }

    /// Insert or replace; the TTL restarts for a replaced key.
    pub fn insert(&self, key: impl Into<String>, reply: CachedReply) {
        let now = self.clock.now();
        self.entries
            .insert(key.into(), CacheEntry::new(reply, now, self.ttl));
        self.stats.inc_insert();
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.inc_cleared();
        }
        removed
    }

    pub fn expire_sweep(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            self.stats.add_expired(removed as u64);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }
}

impl Sweep for ResponseCache {
    fn label(&self) -> &'static str {
        "response"
    }

    fn sweep(&self) -> usize {
        self.expire_sweep(self.clock.now())
    }
}
