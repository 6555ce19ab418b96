//! # Publisher
//!
//! Batch fan-out module.
//!
//! Responsibilities:
//! - Derive the namespaced identity of each batch
//! - Drive every sink through start / append / end in registration order
//! - Isolate failing sinks so the others still complete their phase

pub mod compress;
pub mod error;
pub mod metrics;
pub mod naming;
pub mod publisher;
pub mod sinks;

pub use contracts::{BatchContext, BatchPublisher, BatchSink};
pub use error::PublisherError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use naming::compose_batch_name;
pub use publisher::{FanOutPublisher, PublisherBuilder, PublisherSettings};
pub use sinks::{create_sink, AnySink, FileSink, LogSink, ObjectStoreSink};
