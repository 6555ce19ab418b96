//! Event cache error types

use contracts::PublishError;
use thiserror::Error;

/// Event cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache was closed; no further records or flushes are accepted
    #[error("event cache '{0}' is closed")]
    Closed(String),

    /// Capacity must be at least one record
    #[error("invalid capacity {0}: must be > 0")]
    InvalidCapacity(usize),

    /// The publish worker could not be started
    #[error("failed to start publish worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// The publish worker exited before completing a blocking flush
    #[error("publish worker for '{0}' is gone")]
    WorkerGone(String),

    /// A blocking flush observed a publish failure
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}
