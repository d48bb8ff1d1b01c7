use thiserror::Error;

/// Errors raised by the in-memory caches.
///
/// Only bad caller input can fail a cache operation. Callers treat a failed
/// append as "no prior context" and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
