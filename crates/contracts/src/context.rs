//! BatchContext - identity of a single publish batch
//!
//! Created by the fan-out publisher, handed to every sink for the
//! start/append/end cycle, then either discarded or retained for reuse.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a batch context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(u64);

impl BatchId {
    fn next() -> Self {
        Self(NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// Lifecycle state of a batch as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Created,
    Started,
    Appended,
    Ended,
}

impl BatchState {
    /// Whether `self -> next` is a legal transition
    ///
    /// `Ended -> Started` is how a keep-open context is reopened.
    pub fn can_transition_to(self, next: BatchState) -> bool {
        use BatchState::*;
        matches!(
            (self, next),
            (Created, Started)
                | (Ended, Started)
                | (Started, Appended)
                | (Appended, Appended)
                | (Started, Ended)
                | (Appended, Ended)
        )
    }
}

/// Context for one publish batch
///
/// Identity fields are fixed at creation. Sinks may attach private scratch
/// attributes during start/append/end.
#[derive(Debug, Clone)]
pub struct BatchContext {
    id: BatchId,
    name: String,
    host: Option<String>,
    tags: Vec<String>,
    compress: bool,
    state: BatchState,
    attributes: HashMap<String, String>,
}

impl BatchContext {
    /// Create a fresh context in the `Created` state
    pub fn new(
        name: impl Into<String>,
        host: Option<String>,
        tags: Vec<String>,
        compress: bool,
    ) -> Self {
        Self {
            id: BatchId::next(),
            name: name.into(),
            host,
            tags,
            compress,
            state: BatchState::Created,
            attributes: HashMap::new(),
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Namespaced batch name, e.g. `2024/0131/20240131-235959_web01_app.log.gz`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether sinks should gzip the payload
    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Move to `next`, returning the previous state on an illegal transition
    pub fn advance(&mut self, next: BatchState) -> Result<(), BatchState> {
        if self.state.can_transition_to(next) {
            self.state = next;
            Ok(())
        } else {
            Err(self.state)
        }
    }

    /// Attach a sink-private attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }
}
