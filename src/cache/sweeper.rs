use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// A cache that can drop its expired entries on demand.
pub trait Sweep: Send + Sync {
    fn label(&self) -> &'static str;

    /// Remove expired entries; returns how many were removed.
    fn sweep(&self) -> usize;
}

/// Run one pass over every target. Returns the total removed.
pub fn sweep_all(targets: &[Arc<dyn Sweep>]) -> usize {
    targets
        .iter()
        .map(|target| {
            let removed = target.sweep();
            if removed > 0 {
                debug!(cache = target.label(), removed, "expired entries swept");
            }
            removed
        })
        .sum()
}

/// Spawn the periodic expiry task. Abort the returned handle to stop it.
pub fn spawn_sweeper(targets: Vec<Arc<dyn Sweep>>, every: Duration) -> JoinHandle<()> {
    info!(
        interval_secs = every.as_secs(),
        caches = targets.len(),
        "cache sweeper started"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately; nothing can have expired yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_all(&targets);
        }
    })
}
