use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::clock::Clock;
use super::entry::{CacheEntry, ttl_from_secs};
use super::stats::{CacheStats, CacheStatsSnapshot};
use super::sweeper::Sweep;
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::types::{Speaker, Turn};

/// Longest session identifier accepted, in bytes.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// Reject identifiers that cannot be a sensible map key. Structure is not
/// checked otherwise; ids are opaque.
pub fn validate_session_id(session_id: &str) -> CacheResult<()> {
    if session_id.trim().is_empty() {
        return Err(CacheError::InvalidArgument(
            "session id must not be empty".into(),
        ));
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(CacheError::InvalidArgument(format!(
            "session id longer than {MAX_SESSION_ID_LEN} bytes"
        )));
    }
    if session_id.chars().any(char::is_control) {
        return Err(CacheError::InvalidArgument(
            "session id contains control characters".into(),
        ));
    }
    Ok(())
}

/// Bounded FIFO window of turns, oldest first.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    max_turns: usize,
    turns: Vec<Turn>,
}

impl ContextWindow {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            turns: Vec::new(),
        }
    }

    /// Append and trim from the front. Returns how many turns were dropped.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        if self.turns.len() > self.max_turns {
            let drain_count = self.turns.len() - self.max_turns;
            self.turns.drain(..drain_count);
            drain_count
        } else {
            0
        }
    }

    /// Drop a trailing assistant turn, then a trailing user turn whose text
    /// matches `user_text`. Returns the number of turns removed.
    pub fn retract_last_exchange(&mut self, user_text: &str) -> usize {
        let mut removed = 0;
        if self
            .turns
            .last()
            .is_some_and(|t| t.speaker() == Speaker::Assistant)
        {
            self.turns.pop();
            removed += 1;
        }
        if self
            .turns
            .last()
            .is_some_and(|t| t.speaker() == Speaker::User && t.text().trim() == user_text)
        {
            self.turns.pop();
            removed += 1;
        }
        removed
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Per-session context windows with a fixed TTL from the first message.
///
/// Entries live in a sharded map. Every operation on one session holds that
/// shard's lock for its whole read-modify-write, so concurrent appends to a
/// session serialize while other sessions proceed on other shards.
pub struct ConversationContextCache {
    entries: DashMap<String, CacheEntry<ContextWindow>>,
    max_window: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl ConversationContextCache {
    /// `max_window` is clamped to at least one turn.
    pub fn new(max_window: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            max_window: max_window.max(1),
            ttl,
            clock,
            stats: CacheStats::new(),
        }
    }

    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.max_window_turns,
            ttl_from_secs(config.context_ttl_secs),
            clock,
        )
    }

    /// Append a turn to the session's window, creating the window on first
    /// use. An expired window is replaced, not revived.
    pub fn append(&self, session_id: &str, turn: Turn) -> CacheResult<()> {
        validate_session_id(session_id)?;
        if turn.text().trim().is_empty() {
            return Err(CacheError::InvalidArgument(
                "turn text must not be empty".into(),
            ));
        }

        let now = self.clock.now();
        let mut entry = self
            .entries
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "context window created");
                CacheEntry::new(ContextWindow::new(self.max_window), now, self.ttl)
            });

        if entry.is_expired(now) {
            debug!(session_id, "context window expired, starting fresh");
            *entry = CacheEntry::new(ContextWindow::new(self.max_window), now, self.ttl);
            self.stats.add_expired(1);
        }

        let trimmed = entry.data_mut().push(turn);
        self.stats.inc_insert();
        if trimmed > 0 {
            self.stats.add_trimmed(trimmed as u64);
        }
        Ok(())
    }

    /// The session's window in insertion order; empty when unknown or expired.
    /// Does not extend the TTL.
    pub fn get(&self, session_id: &str) -> Vec<Turn> {
        let now = self.clock.now();
        match self.entries.get(session_id) {
            Some(entry) if !entry.is_expired(now) => {
                self.stats.inc_hit();
                entry.data().turns().to_vec()
            }
            _ => {
                self.stats.inc_miss();
                Vec::new()
            }
        }
    }

    /// Remove the session's window now. Returns whether one was present.
    pub fn clear(&self, session_id: &str) -> bool {
        let removed = self.entries.remove(session_id).is_some();
        if removed {
            self.stats.inc_cleared();
        }
        removed
    }

    /// Undo the most recent exchange so it can be regenerated.
    pub fn retract_last_exchange(&self, session_id: &str, user_text: &str) -> usize {
        let now = self.clock.now();
        match self.entries.get_mut(session_id) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.data_mut().retract_last_exchange(user_text.trim())
            }
            _ => 0,
        }
    }

    /// Remove every entry with `created_at + ttl <= now`.
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

    /// Number of entries held, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_window(&self) -> usize {
        self.max_window
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }
}

impl Sweep for ConversationContextCache {
    fn label(&self) -> &'static str {
        "context"
    }

    fn sweep(&self) -> usize {
        self.expire_sweep(self.clock.now())
    }
}
