//! LogSink - logs batch summaries via tracing

use contracts::{BatchContext, BatchSink, ContractError};
use tracing::{debug, info, instrument};

/// Sink that logs batch summaries for debugging
pub struct LogSink {
    name: String,
    appends: usize,
    bytes: usize,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            appends: 0,
            bytes: 0,
        }
    }

    fn reset(&mut self) {
        self.appends = 0;
        self.bytes = 0;
    }

    fn log_batch_summary(&self, ctx: &BatchContext) {
        info!(
            sink = %self.name,
            batch = %ctx.name(),
            batch_id = %ctx.id(),
            host = ctx.host().unwrap_or("-"),
            tags = ?ctx.tags(),
            appends = self.appends,
            bytes = self.bytes,
            compress = ctx.compress(),
            "Batch ended"
        );
    }
}

impl BatchSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_start",
        skip(self, ctx),
        fields(sink = %self.name, batch = %ctx.name())
    )]
    async fn start(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        self.reset();
        debug!(sink = %self.name, "Batch started");
        Ok(())
    }

    #[instrument(
        name = "log_sink_append",
        skip(self, ctx, text),
        fields(sink = %self.name, batch = %ctx.name())
    )]
    async fn append(&mut self, ctx: &mut BatchContext, text: &str) -> Result<(), ContractError> {
        self.appends += 1;
        self.bytes += text.len();
        Ok(())
    }

    #[instrument(name = "log_sink_end", skip(self, ctx), fields(sink = %self.name))]
    async fn end(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        self.log_batch_summary(ctx);
        self.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_cycle() {
        let mut sink = LogSink::new("test_log");
        let mut ctx = BatchContext::new("2024/0101/a.log", None, vec![], false);

        sink.start(&mut ctx).await.unwrap();
        sink.append(&mut ctx, "abc").await.unwrap();
        sink.append(&mut ctx, "de").await.unwrap();
        assert_eq!(sink.appends, 2);
        assert_eq!(sink.bytes, 5);

        sink.end(&mut ctx).await.unwrap();
        assert_eq!(sink.appends, 0);
        assert_eq!(sink.bytes, 0);
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
