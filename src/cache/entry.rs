use chrono::{DateTime, Duration, Utc};

/// A cached value stamped with its creation time and a fixed time-to-live.
///
/// The TTL never moves after creation: reading or mutating `data` does not
/// extend the entry's life.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    data: V,
    created_at: DateTime<Utc>,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(data: V, created_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            data,
            created_at,
            ttl,
        }
    }

    pub fn data(&self) -> &V {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut V {
        &mut self.data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `None` when `created_at + ttl` is past the end of representable time,
    /// in which case the entry never expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.checked_add_signed(self.ttl)
    }

    /// Expired once `created_at + ttl <= now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// TTL from a configured number of seconds, saturating instead of panicking
/// on values chrono cannot represent.
pub fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
