//! # Event Cache
//!
//! Producer-facing batching buffer.
//!
//! Responsibilities:
//! - Accumulate pre-formatted records under one short-held lock
//! - Drain a batch when the capacity threshold is reached
//! - Hand every batch to a single publish worker, in submission order
//! - Periodically republish the open buffer into the same batch (keep-open)
//!
//! ## Architecture
//!
//! ```text
//! producers --add--> [buffer + count] --drain--> job queue --> publish worker
//!                                                    ^              |
//!                                                auto-flush       BatchPublisher
//!                                                  timer            (fan-out)
//! ```
//!
//! The worker is an OS thread driving a current-thread Tokio runtime, so
//! producers and blocking callers never need a runtime of their own.

pub mod cache;
pub mod error;
pub mod metrics;
mod worker;

pub use cache::{EventCache, FlushStatus, PublishReport};
pub use error::CacheError;
pub use metrics::{CacheMetrics, CacheMetricsSnapshot};
pub use worker::{is_publish_thread, PUBLISH_THREAD_NAME};
