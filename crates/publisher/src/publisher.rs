//! FanOutPublisher - drives every sink through the batch lifecycle

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{debug, info, instrument, warn};

use contracts::{
    BatchContext, BatchPublisher, BatchSink, BatchState, ContractError, PublishError,
    PublishPhase, SinkConfig, SinkFailure,
};
use observability::record_sink_phase;

use crate::error::PublisherError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::naming::compose_batch_name;
use crate::sinks::{create_sink, AnySink};

/// Identity settings stamped on every batch context
#[derive(Debug, Clone, Default)]
pub struct PublisherSettings {
    /// Host label, `None` leaves it out of batch names
    pub host: Option<String>,
    /// Classification tags
    pub tags: Vec<String>,
    /// Gzip payloads and append `.gz`
    pub compress: bool,
    /// Stamp batch names with local time instead of UTC
    pub local_time: bool,
}

struct SinkSlot<S> {
    name: String,
    sink: S,
    metrics: Arc<SinkMetrics>,
    /// Failed an earlier phase of the current batch
    failed: bool,
}

impl<S> SinkSlot<S> {
    fn record_failure(
        &mut self,
        phase: PublishPhase,
        error: ContractError,
        failures: &mut Vec<SinkFailure>,
    ) {
        self.failed = true;
        self.metrics.inc_failure_count();
        record_sink_phase(&self.name, phase.as_str(), false);
        warn!(sink = %self.name, phase = %phase, error = %error, "Sink phase failed");
        failures.push(SinkFailure {
            sink_name: self.name.clone(),
            phase,
            error,
        });
    }

    fn record_success(&self, phase: PublishPhase) {
        record_sink_phase(&self.name, phase.as_str(), true);
    }

    fn skip(&self, phase: PublishPhase) {
        self.metrics.inc_skipped_count();
        debug!(sink = %self.name, phase = %phase, "Skipping sink that failed earlier in batch");
    }
}

/// Fan-out coordinator over an ordered set of sinks
///
/// Sinks are registered at configuration time with [`add_sink`](Self::add_sink);
/// publishing takes `&mut self`, so registration cannot race a batch.
pub struct FanOutPublisher<S = AnySink> {
    settings: PublisherSettings,
    sinks: Vec<SinkSlot<S>>,
}

impl<S: BatchSink + Send> FanOutPublisher<S> {
    /// Create a publisher with no sinks
    pub fn new(settings: PublisherSettings) -> Self {
        Self {
            settings,
            sinks: Vec::new(),
        }
    }

    /// Append a sink to the fan-out order
    pub fn add_sink(&mut self, sink: S) {
        self.sinks.push(SinkSlot {
            name: sink.name().to_string(),
            sink,
            metrics: Arc::new(SinkMetrics::new()),
            failed: false,
        });
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.settings
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Sink names in fan-out order
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name.as_str()).collect()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sinks
            .iter()
            .map(|s| (s.name.clone(), s.metrics.snapshot()))
            .collect()
    }

    /// Shared metrics handles, usable after the publisher moved to a worker
    pub fn metrics_handles(&self) -> Vec<(String, Arc<SinkMetrics>)> {
        self.sinks
            .iter()
            .map(|s| (s.name.clone(), Arc::clone(&s.metrics)))
            .collect()
    }

    /// Create a context for a batch at an explicit time
    ///
    /// The date partition and timestamp are rendered in `now`'s own zone.
    pub fn create_context_at<Tz>(&self, cache_name: &str, now: DateTime<Tz>) -> BatchContext
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let name = compose_batch_name(
            cache_name,
            self.settings.host.as_deref(),
            self.settings.compress,
            now,
        );
        BatchContext::new(
            name,
            self.settings.host.clone(),
            self.settings.tags.clone(),
            self.settings.compress,
        )
    }
}

impl FanOutPublisher<AnySink> {
    /// Build a publisher from sink configurations, preserving their order
    #[instrument(name = "publisher_from_config", skip(settings, sinks), fields(sink_count = sinks.len()))]
    pub fn from_config(
        settings: PublisherSettings,
        sinks: &[SinkConfig],
    ) -> Result<Self, PublisherError> {
        sinks
            .iter()
            .try_fold(PublisherBuilder::new(settings), |builder, config| {
                builder.sink_from_config(config)
            })
            .map(PublisherBuilder::build)
    }
}

fn transition(ctx: &mut BatchContext, next: BatchState) -> Result<(), PublishError> {
    ctx.advance(next)
        .map_err(|from| PublishError::InvalidTransition {
            batch: ctx.name().to_string(),
            from,
            to: next,
        })
}

fn phase_result(ctx: &BatchContext, failures: Vec<SinkFailure>) -> Result<(), PublishError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(PublishError::Sinks {
            batch: ctx.name().to_string(),
            failures,
        })
    }
}

impl<S: BatchSink + Send> BatchPublisher for FanOutPublisher<S> {
    fn create_context(&self, cache_name: &str) -> BatchContext {
        if self.settings.local_time {
            self.create_context_at(cache_name, Local::now())
        } else {
            self.create_context_at(cache_name, Utc::now())
        }
    }

    #[instrument(name = "publisher_start", skip(self, ctx), fields(batch = %ctx.name()))]
    async fn start_publish(&mut self, ctx: &mut BatchContext) -> Result<(), PublishError> {
        transition(ctx, BatchState::Started)?;

        let mut failures = Vec::new();
        for slot in &mut self.sinks {
            slot.failed = false;
            match slot.sink.start(ctx).await {
                Ok(()) => {
                    slot.metrics.inc_started_count();
                    slot.record_success(PublishPhase::Start);
                }
                Err(e) => slot.record_failure(PublishPhase::Start, e, &mut failures),
            }
        }
        phase_result(ctx, failures)
    }

    #[instrument(name = "publisher_append", skip(self, ctx, text), fields(batch = %ctx.name(), bytes = text.len()))]
    async fn publish(&mut self, ctx: &mut BatchContext, text: &str) -> Result<(), PublishError> {
        transition(ctx, BatchState::Appended)?;

        let mut failures = Vec::new();
        for slot in &mut self.sinks {
            if slot.failed {
                slot.skip(PublishPhase::Append);
                continue;
            }
            match slot.sink.append(ctx, text).await {
                Ok(()) => {
                    slot.metrics.inc_append_count();
                    slot.record_success(PublishPhase::Append);
                }
                Err(e) => slot.record_failure(PublishPhase::Append, e, &mut failures),
            }
        }
        phase_result(ctx, failures)
    }

    #[instrument(name = "publisher_end", skip(self, ctx), fields(batch = %ctx.name()))]
    async fn end_publish(&mut self, ctx: &mut BatchContext) -> Result<(), PublishError> {
        transition(ctx, BatchState::Ended)?;

        let mut failures = Vec::new();
        for slot in &mut self.sinks {
            if slot.failed {
                slot.skip(PublishPhase::End);
                continue;
            }
            match slot.sink.end(ctx).await {
                Ok(()) => {
                    slot.metrics.inc_ended_count();
                    slot.record_success(PublishPhase::End);
                }
                Err(e) => slot.record_failure(PublishPhase::End, e, &mut failures),
            }
        }

        info!(
            batch = %ctx.name(),
            sinks = self.sinks.len(),
            failed = failures.len(),
            "END publishing"
        );
        phase_result(ctx, failures)
    }
}

/// Builder assembling the tagged sink set from configuration
pub struct PublisherBuilder {
    settings: PublisherSettings,
    sinks: Vec<AnySink>,
}

impl PublisherBuilder {
    /// Create a new PublisherBuilder
    pub fn new(settings: PublisherSettings) -> Self {
        Self {
            settings,
            sinks: Vec::new(),
        }
    }

    /// Add an already constructed sink
    pub fn sink(mut self, sink: impl Into<AnySink>) -> Self {
        self.sinks.push(sink.into());
        self
    }

    /// Create a sink from configuration and add it
    pub fn sink_from_config(self, config: &SinkConfig) -> Result<Self, PublisherError> {
        Ok(self.sink(create_sink(config)?))
    }

    /// Build the publisher
    pub fn build(self) -> FanOutPublisher<AnySink> {
        let mut publisher = FanOutPublisher::new(self.settings);
        for sink in self.sinks {
            publisher.add_sink(sink);
        }
        info!(sinks = ?publisher.sink_names(), "Publisher built");
        publisher
    }
}
