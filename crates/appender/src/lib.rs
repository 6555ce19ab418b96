//! # Appender
//!
//! Embedding surface of the log shipper: an explicit
//! `initialize(config)` / `shutdown()` pair around one event cache and its
//! fan-out publisher.

mod appender;
mod error;

pub use appender::{generate_cache_name, resolve_host, LogAppender, LINE_SEPARATOR};
pub use error::AppenderError;
pub use event_cache::{CacheMetricsSnapshot, FlushStatus, PublishReport};
