//! BatchPublisher trait - the collaborator the event cache publishes through

use crate::{BatchContext, PublishError};

/// Publishing collaborator of the event cache
///
/// Creates batch contexts and drives the three publish phases. A context may
/// be handed back to `start_publish` after `end_publish` when the batch is
/// kept open.
#[trait_variant::make(BatchPublisher: Send)]
pub trait LocalBatchPublisher {
    /// Create a context for a batch of records named after `cache_name`
    fn create_context(&self, cache_name: &str) -> BatchContext;

    /// Start (or reopen) a batch
    async fn start_publish(&mut self, ctx: &mut BatchContext) -> Result<(), PublishError>;

    /// Publish buffered text into the batch
    async fn publish(&mut self, ctx: &mut BatchContext, text: &str) -> Result<(), PublishError>;

    /// Conclude the batch; destinations commit here
    async fn end_publish(&mut self, ctx: &mut BatchContext) -> Result<(), PublishError>;
}
