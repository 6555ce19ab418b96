//! Publish worker - the single serialized executor of an event cache

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use contracts::{BatchContext, BatchPublisher, BatchState, PublishError, SinkFailure};
use observability::{record_batch_failed, record_batch_published};

use crate::cache::{Job, PublishJob, PublishReport, Shared};

/// Thread name of every publish worker
pub const PUBLISH_THREAD_NAME: &str = "event-cache-publish";

/// Whether the current thread is a publish worker
///
/// Loggers feeding an event cache use this to drop records emitted by the
/// publishing path itself.
pub fn is_publish_thread() -> bool {
    thread::current().name() == Some(PUBLISH_THREAD_NAME)
}

pub(crate) fn spawn<P>(
    shared: Arc<Shared>,
    publisher: P,
    jobs: UnboundedReceiver<Job>,
    auto_flush: Duration,
) -> std::io::Result<JoinHandle<()>>
where
    P: BatchPublisher + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let worker = PublishWorker {
        shared,
        publisher,
        jobs,
        auto_flush,
        retained: None,
    };

    thread::Builder::new()
        .name(PUBLISH_THREAD_NAME.to_string())
        .spawn(move || runtime.block_on(worker.run()))
}

struct PublishWorker<P> {
    shared: Arc<Shared>,
    publisher: P,
    jobs: UnboundedReceiver<Job>,
    auto_flush: Duration,
    /// Context of the most recent keep-open publish
    retained: Option<BatchContext>,
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl<P: BatchPublisher> PublishWorker<P> {
    async fn run(mut self) {
        let mut timer = (!self.auto_flush.is_zero()).then(|| {
            let mut timer = time::interval_at(Instant::now() + self.auto_flush, self.auto_flush);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer
        });

        debug!(
            cache = %self.shared.name(),
            auto_flush_ms = self.auto_flush.as_millis() as u64,
            "Publish worker started"
        );

        loop {
            tokio::select! {
                biased;

                job = self.jobs.recv() => match job {
                    Some(Job::Publish(job)) => self.handle(job).await,
                    Some(Job::Shutdown) | None => break,
                },

                _ = next_tick(&mut timer) => {
                    // Queued behind already submitted batches, so FIFO holds.
                    if let Err(e) = self.shared.flush_open_batch() {
                        warn!(cache = %self.shared.name(), error = %e, "Auto-flush not submitted");
                    }
                }
            }
        }

        if let Some(ctx) = self.retained.take() {
            debug!(cache = %self.shared.name(), batch = %ctx.name(), "Releasing retained context");
        }
        debug!(cache = %self.shared.name(), "Publish worker stopped");
    }

    #[instrument(
        name = "publish_worker_job",
        skip(self, job),
        fields(cache = %self.shared.name(), records = job.snapshot.records, keep_open = job.keep_open)
    )]
    async fn handle(&mut self, job: PublishJob) {
        let PublishJob {
            snapshot,
            keep_open,
            done,
        } = job;

        let started = std::time::Instant::now();
        let reused_context = self.retained.is_some();
        let mut ctx = match self.retained.take() {
            Some(ctx) => ctx,
            None => self.publisher.create_context(self.shared.name()),
        };

        let result = AssertUnwindSafe(drive(&mut self.publisher, &mut ctx, &snapshot.text))
            .catch_unwind()
            .await;
        let panicked = result.is_err();
        let result = result.unwrap_or_else(|payload| {
            Err(PublishError::Panicked {
                batch: ctx.name().to_string(),
                message: panic_message(payload.as_ref()),
            })
        });
        let elapsed = started.elapsed();
        let latency_ms = elapsed.as_secs_f64() * 1000.0;

        let report = PublishReport {
            batch_id: ctx.id(),
            batch: ctx.name().to_string(),
            records: snapshot.records,
            bytes: snapshot.text.len(),
            keep_open,
            reused_context,
            elapsed,
        };

        let outcome = match result {
            Ok(()) => {
                self.shared.metrics().inc_batches_published();
                if !keep_open {
                    self.shared.metrics().add_records_published(report.records);
                }
                record_batch_published(self.shared.name(), report.records, report.bytes, latency_ms);
                self.shared
                    .with_stats(|s| s.record_success(report.records, report.bytes, latency_ms, reused_context));
                info!(
                    cache = %self.shared.name(),
                    batch = %report.batch,
                    records = report.records,
                    bytes = report.bytes,
                    keep_open,
                    reused_context,
                    elapsed_ms = latency_ms,
                    "Batch published"
                );
                Ok(report)
            }
            Err(e) => {
                self.shared.metrics().inc_batches_failed();
                record_batch_failed(self.shared.name());
                self.shared.with_stats(|s| s.record_failure(latency_ms));
                error!(
                    cache = %self.shared.name(),
                    batch = %report.batch,
                    records = report.records,
                    error = %e,
                    "Batch publish failed, batch dropped"
                );
                Err(e)
            }
        };

        // A context left mid-lifecycle cannot be reopened.
        if keep_open && !panicked && ctx.state() == BatchState::Ended {
            self.retained = Some(ctx);
        }

        if let Some(done) = done {
            // The blocking caller may have given up; nothing to report to.
            let _ = done.send(outcome);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run all three phases, merging sink failures
///
/// Only a lifecycle error aborts the remaining phases.
async fn drive<P: BatchPublisher>(
    publisher: &mut P,
    ctx: &mut BatchContext,
    text: &str,
) -> Result<(), PublishError> {
    let mut failures = Vec::new();
    collect(publisher.start_publish(ctx).await, &mut failures)?;
    collect(publisher.publish(ctx, text).await, &mut failures)?;
    collect(publisher.end_publish(ctx).await, &mut failures)?;

    if failures.is_empty() {
        Ok(())
    } else {
        Err(PublishError::Sinks {
            batch: ctx.name().to_string(),
            failures,
        })
    }
}

fn collect(
    result: Result<(), PublishError>,
    failures: &mut Vec<SinkFailure>,
) -> Result<(), PublishError> {
    match result {
        Err(PublishError::Sinks {
            failures: phase, ..
        }) => {
            failures.extend(phase);
            Ok(())
        }
        other => other,
    }
}
