pub mod clock;
pub mod context;
pub mod entry;
pub mod response;
pub mod stats;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ContextWindow, ConversationContextCache, validate_session_id};
pub use entry::{CacheEntry, ttl_from_secs};
pub use response::{CachedReply, ResponseCache};
pub use stats::CacheStatsSnapshot;
pub use sweeper::{Sweep, spawn_sweeper, sweep_all};
