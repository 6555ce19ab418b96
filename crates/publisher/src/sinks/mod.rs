//! Sink implementations
//!
//! Contains LogSink, FileSink, and ObjectStoreSink, plus the `AnySink`
//! tagged set the publisher is assembled from at runtime.

mod file;
mod log;
mod object_store;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::object_store::{ObjectStoreSink, ObjectStoreSinkConfig, PREFIX_MARKER};

use contracts::{BatchContext, BatchSink, ContractError, SinkConfig, SinkType};

use crate::error::PublisherError;

/// Runtime-selected sink
pub enum AnySink {
    Log(LogSink),
    File(FileSink),
    ObjectStore(ObjectStoreSink),
}

impl From<LogSink> for AnySink {
    fn from(sink: LogSink) -> Self {
        Self::Log(sink)
    }
}

impl From<FileSink> for AnySink {
    fn from(sink: FileSink) -> Self {
        Self::File(sink)
    }
}

impl From<ObjectStoreSink> for AnySink {
    fn from(sink: ObjectStoreSink) -> Self {
        Self::ObjectStore(sink)
    }
}

impl BatchSink for AnySink {
    fn name(&self) -> &str {
        match self {
            Self::Log(s) => s.name(),
            Self::File(s) => s.name(),
            Self::ObjectStore(s) => s.name(),
        }
    }

    async fn start(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.start(ctx).await,
            Self::File(s) => s.start(ctx).await,
            Self::ObjectStore(s) => s.start(ctx).await,
        }
    }

    async fn append(&mut self, ctx: &mut BatchContext, text: &str) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.append(ctx, text).await,
            Self::File(s) => s.append(ctx, text).await,
            Self::ObjectStore(s) => s.append(ctx, text).await,
        }
    }

    async fn end(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        match self {
            Self::Log(s) => s.end(ctx).await,
            Self::File(s) => s.end(ctx).await,
            Self::ObjectStore(s) => s.end(ctx).await,
        }
    }
}

/// Create a sink from its configuration entry
pub fn create_sink(config: &SinkConfig) -> Result<AnySink, PublisherError> {
    let sink = match config.sink_type {
        SinkType::Log => AnySink::Log(LogSink::new(&config.name)),
        SinkType::File => AnySink::File(
            FileSink::from_params(&config.name, &config.params)
                .map_err(|e| PublisherError::sink_creation(&config.name, e.to_string()))?,
        ),
        SinkType::ObjectStore => AnySink::ObjectStore(
            ObjectStoreSink::from_params(&config.name, &config.params)
                .map_err(|e| PublisherError::sink_creation(&config.name, e.to_string()))?,
        ),
    };
    Ok(sink)
}
