//! Appender error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppenderError {
    #[error("failed to resolve local hostname: {0}")]
    Hostname(#[source] std::io::Error),

    #[error("publisher setup failed: {0}")]
    Publisher(#[from] publisher::PublisherError),

    #[error(transparent)]
    Cache(#[from] event_cache::CacheError),
}
