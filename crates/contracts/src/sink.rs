//! BatchSink trait - publisher output interface
//!
//! Defines the abstract interface for remote destinations.

use crate::{BatchContext, ContractError};

/// Batch destination trait
///
/// All sink implementations must implement this trait. A sink is driven
/// through `start -> append* -> end` once per batch and must be reusable for
/// the next batch after `end`.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Prepare the destination for a batch
    ///
    /// Must be idempotent with respect to an already prepared destination:
    /// "already exists" is success.
    async fn start(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError>;

    /// Accumulate text into the sink-local buffer
    ///
    /// Must not perform the remote write.
    async fn append(&mut self, ctx: &mut BatchContext, text: &str) -> Result<(), ContractError>;

    /// Materialize the accumulated buffer and reset it
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn end(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError>;
}
