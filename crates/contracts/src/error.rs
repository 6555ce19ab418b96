//! Layered error definitions
//!
//! Categorized by source: config / sink / publish

use std::fmt;

use thiserror::Error;

use crate::BatchState;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Destination could not be prepared
    #[error("sink '{sink_name}' prepare error: {message}")]
    SinkPrepare { sink_name: String, message: String },

    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Payload compression failed
    #[error("compression error: {0}")]
    Compression(String),

    /// Object store backend error
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink prepare error
    pub fn sink_prepare(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkPrepare {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Publish phase a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Start,
    Append,
    End,
}

impl PublishPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Append => "append",
            Self::End => "end",
        }
    }
}

impl fmt::Display for PublishPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sink's failure during a publish phase
#[derive(Debug)]
pub struct SinkFailure {
    pub sink_name: String,
    pub phase: PublishPhase,
    pub error: ContractError,
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed on {}: {}", self.sink_name, self.phase, self.error)
    }
}

/// Publish errors reported by a `BatchPublisher`
#[derive(Debug, Error)]
pub enum PublishError {
    /// The batch lifecycle was driven out of order
    #[error("batch '{batch}' cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        batch: String,
        from: BatchState,
        to: BatchState,
    },

    /// One or more sinks failed; the others completed their phase
    #[error("batch '{batch}' failed on {} sink(s): {}", failures.len(), join_failures(failures))]
    Sinks {
        batch: String,
        failures: Vec<SinkFailure>,
    },

    /// The publishing path panicked; the batch was dropped
    #[error("batch '{batch}' panicked during publish: {message}")]
    Panicked { batch: String, message: String },
}

impl PublishError {
    /// Sink failures carried by this error (empty for lifecycle errors)
    pub fn failures(&self) -> &[SinkFailure] {
        match self {
            Self::Sinks { failures, .. } => failures,
            Self::InvalidTransition { .. } | Self::Panicked { .. } => &[],
        }
    }
}

fn join_failures(failures: &[SinkFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
