//! EventCache - mutex-guarded record buffer with a single publish worker

use std::mem;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};

use contracts::{BatchId, BatchPublisher, PublishError};
use observability::{record_buffer_depth, record_empty_flush, record_record_added, PublishStats};

use crate::error::CacheError;
use crate::metrics::{CacheMetrics, CacheMetricsSnapshot};
use crate::worker;

/// Outcome of one published batch
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub batch_id: BatchId,
    /// Namespaced batch name
    pub batch: String,
    pub records: usize,
    pub bytes: usize,
    pub keep_open: bool,
    /// The batch continued the context of a previous keep-open publish
    pub reused_context: bool,
    pub elapsed: Duration,
}

/// Result of a flush request
#[derive(Debug)]
pub enum FlushStatus {
    /// Nothing was buffered; no sink was invoked
    Empty,
    /// Handed to the worker without waiting
    Submitted,
    /// Published while the caller waited
    Published(PublishReport),
}

pub(crate) struct Snapshot {
    pub(crate) text: String,
    pub(crate) records: usize,
}

type Completion = SyncSender<Result<PublishReport, PublishError>>;

pub(crate) struct PublishJob {
    pub(crate) snapshot: Snapshot,
    pub(crate) keep_open: bool,
    pub(crate) done: Option<Completion>,
}

pub(crate) enum Job {
    Publish(PublishJob),
    Shutdown,
}

#[derive(Default)]
struct BufferState {
    text: String,
    count: usize,
    closed: bool,
}

impl BufferState {
    /// Capture the buffer; keep-open leaves it in place
    fn capture(&mut self, keep_open: bool) -> Option<Snapshot> {
        if self.count == 0 {
            return None;
        }
        let snapshot = if keep_open {
            Snapshot {
                text: self.text.clone(),
                records: self.count,
            }
        } else {
            Snapshot {
                text: mem::take(&mut self.text),
                records: mem::replace(&mut self.count, 0),
            }
        };
        Some(snapshot)
    }
}

enum Submission {
    Empty,
    Queued(Option<Receiver<Result<PublishReport, PublishError>>>),
}

/// State shared between the cache handle and its worker
pub(crate) struct Shared {
    name: String,
    buffer: Mutex<BufferState>,
    jobs: UnboundedSender<Job>,
    metrics: CacheMetrics,
    stats: Mutex<PublishStats>,
}

impl Shared {
    fn new(name: String, jobs: UnboundedSender<Job>) -> Self {
        Self {
            name,
            buffer: Mutex::new(BufferState::default()),
            jobs,
            metrics: CacheMetrics::new(),
            stats: Mutex::new(PublishStats::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub(crate) fn with_stats(&self, f: impl FnOnce(&mut PublishStats)) {
        f(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn lock_buffer(&self) -> MutexGuard<'_, BufferState> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture and enqueue while the caller holds the buffer lock
    ///
    /// Enqueueing under the lock keeps batches in capture order.
    fn enqueue_locked(
        &self,
        state: &mut BufferState,
        keep_open: bool,
        wait: bool,
    ) -> Result<Submission, CacheError> {
        let Some(snapshot) = state.capture(keep_open) else {
            return Ok(Submission::Empty);
        };

        let (done, rx) = if wait {
            let (tx, rx) = sync_channel(1);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        self.jobs
            .send(Job::Publish(PublishJob {
                snapshot,
                keep_open,
                done,
            }))
            .map_err(|_| CacheError::WorkerGone(self.name.clone()))?;
        self.metrics.inc_batches_submitted();
        Ok(Submission::Queued(rx))
    }

    /// Timer action: republish the open buffer into the retained batch
    pub(crate) fn flush_open_batch(&self) -> Result<(), CacheError> {
        let mut state = self.lock_buffer();
        if state.closed {
            return Ok(());
        }
        self.enqueue_locked(&mut state, true, false).map(|_| ())
    }
}

/// Batching event cache
///
/// Producers call [`add`](Self::add) from any thread. A batch is drained when
/// `capacity` records are buffered, on an explicit flush, on every
/// auto-flush tick (keep-open), and at [`close`](Self::close).
pub struct EventCache {
    name: String,
    capacity: usize,
    shared: Arc<Shared>,
    worker_thread: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventCache {
    /// Create a cache and start its publish worker
    ///
    /// A zero `auto_flush` disables the periodic flush.
    pub fn new<P>(
        name: impl Into<String>,
        capacity: usize,
        auto_flush: Duration,
        publisher: P,
    ) -> Result<Self, CacheError>
    where
        P: BatchPublisher + Send + 'static,
    {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }

        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(name.clone(), tx));
        let handle = worker::spawn(Arc::clone(&shared), publisher, rx, auto_flush)?;

        info!(
            cache = %name,
            capacity,
            auto_flush_secs = auto_flush.as_secs_f64(),
            "Event cache created"
        );

        Ok(Self {
            name,
            capacity,
            shared,
            worker_thread: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records currently buffered
    pub fn buffered_records(&self) -> usize {
        self.shared.lock_buffer().count
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock_buffer().closed
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Aggregated publish statistics
    pub fn stats(&self) -> PublishStats {
        self.shared
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn on_worker(&self) -> bool {
        thread::current().id() == self.worker_thread
    }

    /// Buffer one record
    ///
    /// Reaching capacity drains the buffer and submits it without waiting.
    pub fn add(&self, text: &str) -> Result<(), CacheError> {
        let depth = {
            let mut state = self.shared.lock_buffer();
            if state.closed {
                return Err(CacheError::Closed(self.name.clone()));
            }
            state.text.push_str(text);
            state.count += 1;
            if state.count >= self.capacity {
                debug!(cache = %self.name, records = state.count, "Capacity reached");
                self.shared.enqueue_locked(&mut state, false, false)?;
            }
            state.count
        };

        self.shared.metrics.inc_records_added();
        record_record_added(&self.name);
        record_buffer_depth(&self.name, depth);
        Ok(())
    }

    /// Flush the buffer to the worker
    ///
    /// `keep_open` leaves the buffer in place and keeps the batch context for
    /// the next publish. With `block` the caller waits for the publish and
    /// receives its failure; a blocking call made on the worker itself is
    /// downgraded to a submission.
    pub fn flush_and_publish(&self, block: bool, keep_open: bool) -> Result<FlushStatus, CacheError> {
        let wait = block && !self.on_worker();
        let submission = {
            let mut state = self.shared.lock_buffer();
            if state.closed {
                return Err(CacheError::Closed(self.name.clone()));
            }
            self.shared.enqueue_locked(&mut state, keep_open, wait)?
        };

        if matches!(submission, Submission::Empty) {
            self.shared.metrics.inc_empty_flushes();
            self.shared.with_stats(PublishStats::record_empty);
            record_empty_flush(&self.name);
        }
        self.settle(submission)
    }

    fn settle(&self, submission: Submission) -> Result<FlushStatus, CacheError> {
        match submission {
            Submission::Empty => Ok(FlushStatus::Empty),
            Submission::Queued(None) => Ok(FlushStatus::Submitted),
            Submission::Queued(Some(rx)) => match rx.recv() {
                Ok(Ok(report)) => Ok(FlushStatus::Published(report)),
                Ok(Err(e)) => Err(CacheError::Publish(e)),
                Err(_) => Err(CacheError::WorkerGone(self.name.clone())),
            },
        }
    }

    /// Publish the remainder and stop the worker
    ///
    /// Waits for the final batch and every batch queued before it. Calling it
    /// again is a no-op returning [`FlushStatus::Empty`].
    pub fn close(&self) -> Result<FlushStatus, CacheError> {
        let submission = {
            let mut state = self.shared.lock_buffer();
            if state.closed {
                return Ok(FlushStatus::Empty);
            }
            state.closed = true;
            self.shared
                .enqueue_locked(&mut state, false, !self.on_worker())
        };

        let outcome = submission.and_then(|s| self.settle(s));
        self.stop_worker();

        info!(cache = %self.name, metrics = ?self.metrics(), "Event cache closed");
        outcome
    }

    fn stop_worker(&self) {
        // Fails only if the worker already exited.
        let _ = self.shared.jobs.send(Job::Shutdown);

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        if self.on_worker() {
            debug!(cache = %self.name, "Close requested from publish worker, not joining");
            return;
        }
        if handle.join().is_err() {
            error!(cache = %self.name, "Publish worker panicked");
        }
    }
}

impl Drop for EventCache {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(cache = %self.name, error = %e, "Final flush failed while dropping cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_publish_thread;
    use contracts::{BatchContext, BatchState, ContractError, PublishPhase, SinkFailure};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Rejected(BatchId),
        Start(BatchId),
        Publish(BatchId, String),
        End(BatchId),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
        in_flight: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
        on_publish_thread: Arc<AtomicBool>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn published(&self) -> Vec<(BatchId, String)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Publish(id, text) => Some((id, text)),
                    _ => None,
                })
                .collect()
        }
    }

    struct MockPublisher {
        recorder: Recorder,
        fail_end: bool,
        delay: Duration,
        /// Starts to reject as out of order before accepting again
        reject_starts: usize,
        /// Zero-based `end_publish` call that panics
        panic_at_end: Option<usize>,
        ends: usize,
    }

    impl MockPublisher {
        fn new(recorder: &Recorder) -> Self {
            Self {
                recorder: recorder.clone(),
                fail_end: false,
                delay: Duration::ZERO,
                reject_starts: 0,
                panic_at_end: None,
                ends: 0,
            }
        }
    }

    fn step(ctx: &mut BatchContext, next: BatchState) -> Result<(), PublishError> {
        ctx.advance(next).map_err(|from| PublishError::InvalidTransition {
            batch: ctx.name().to_string(),
            from,
            to: next,
        })
    }

    impl BatchPublisher for MockPublisher {
        fn create_context(&self, cache_name: &str) -> BatchContext {
            BatchContext::new(cache_name, None, vec![], false)
        }

        async fn start_publish(&mut self, ctx: &mut BatchContext) -> Result<(), PublishError> {
            if self.recorder.in_flight.swap(true, Ordering::SeqCst) {
                self.recorder.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            self.recorder
                .on_publish_thread
                .store(is_publish_thread(), Ordering::SeqCst);
            if self.reject_starts > 0 {
                self.reject_starts -= 1;
                self.recorder.in_flight.store(false, Ordering::SeqCst);
                self.recorder.events.lock().unwrap().push(Event::Rejected(ctx.id()));
                return Err(PublishError::InvalidTransition {
                    batch: ctx.name().to_string(),
                    from: BatchState::Appended,
                    to: BatchState::Started,
                });
            }
            step(ctx, BatchState::Started)?;
            self.recorder.events.lock().unwrap().push(Event::Start(ctx.id()));
            Ok(())
        }

        async fn publish(&mut self, ctx: &mut BatchContext, text: &str) -> Result<(), PublishError> {
            step(ctx, BatchState::Appended)?;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.recorder
                .events
                .lock()
                .unwrap()
                .push(Event::Publish(ctx.id(), text.to_string()));
            Ok(())
        }

        async fn end_publish(&mut self, ctx: &mut BatchContext) -> Result<(), PublishError> {
            step(ctx, BatchState::Ended)?;
            self.recorder.events.lock().unwrap().push(Event::End(ctx.id()));
            self.recorder.in_flight.store(false, Ordering::SeqCst);
            let call = self.ends;
            self.ends += 1;
            if self.panic_at_end == Some(call) {
                panic!("sink exploded on end {}", call);
            }
            if self.fail_end {
                return Err(PublishError::Sinks {
                    batch: ctx.name().to_string(),
                    failures: vec![SinkFailure {
                        sink_name: "mock".to_string(),
                        phase: PublishPhase::End,
                        error: ContractError::sink_write("mock", "unreachable"),
                    }],
                });
            }
            Ok(())
        }
    }

    fn cache(capacity: usize, recorder: &Recorder) -> EventCache {
        EventCache::new("test", capacity, Duration::ZERO, MockPublisher::new(recorder)).unwrap()
    }

    #[test]
    fn test_capacity_three_publishes_abc_and_keeps_d() {
        let recorder = Recorder::default();
        let cache = cache(3, &recorder);

        for record in ["a", "b", "c", "d"] {
            cache.add(record).unwrap();
        }
        assert_eq!(cache.buffered_records(), 1);

        cache.close().unwrap();
        let published = recorder.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1, "abc");
        assert_eq!(published[1].1, "d");
        assert_ne!(published[0].0, published[1].0);
    }

    #[test]
    fn test_empty_flush_invokes_no_sink() {
        let recorder = Recorder::default();
        let cache = cache(3, &recorder);

        assert!(matches!(
            cache.flush_and_publish(true, false).unwrap(),
            FlushStatus::Empty
        ));
        assert!(matches!(
            cache.flush_and_publish(false, true).unwrap(),
            FlushStatus::Empty
        ));
        assert!(matches!(cache.close().unwrap(), FlushStatus::Empty));

        assert!(recorder.events().is_empty());
        assert_eq!(cache.metrics().empty_flushes, 2);
        assert_eq!(cache.metrics().batches_submitted, 0);
    }

    #[test]
    fn test_phase_order_within_batch() {
        let recorder = Recorder::default();
        let cache = cache(10, &recorder);
        cache.add("x").unwrap();
        let FlushStatus::Published(report) = cache.flush_and_publish(true, false).unwrap() else {
            panic!("expected a published batch");
        };

        let id = report.batch_id;
        assert_eq!(
            recorder.events(),
            vec![
                Event::Start(id),
                Event::Publish(id, "x".to_string()),
                Event::End(id)
            ]
        );
        assert_eq!(report.records, 1);
        assert!(!report.reused_context);
    }

    #[test]
    fn test_keep_open_reuses_context_until_closed_batch() {
        let recorder = Recorder::default();
        let cache = cache(10, &recorder);
        cache.add("a").unwrap();

        let published = |status| match status {
            FlushStatus::Published(report) => report,
            other => panic!("expected a published batch, got {:?}", other),
        };

        let first = published(cache.flush_and_publish(true, true).unwrap());
        let second = published(cache.flush_and_publish(true, true).unwrap());
        assert_eq!(first.batch_id, second.batch_id);
        assert!(!first.reused_context);
        assert!(second.reused_context);
        assert_eq!(cache.buffered_records(), 1);

        cache.add("b").unwrap();
        let third = published(cache.flush_and_publish(true, false).unwrap());
        assert_eq!(third.batch_id, first.batch_id);
        assert_eq!(third.records, 2);
        assert_eq!(cache.buffered_records(), 0);

        cache.add("c").unwrap();
        let fourth = published(cache.flush_and_publish(true, false).unwrap());
        assert_ne!(fourth.batch_id, first.batch_id);

        let texts: Vec<_> = recorder.published().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["a", "a", "ab", "c"]);
    }

    #[test]
    fn test_capacity_flush_then_fresh_context() {
        let recorder = Recorder::default();
        let cache = cache(2, &recorder);
        for record in ["a", "b", "c", "d"] {
            cache.add(record).unwrap();
        }
        assert!(matches!(cache.close().unwrap(), FlushStatus::Empty));

        let published = recorder.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1, "ab");
        assert_eq!(published[1].1, "cd");
        assert_ne!(published[0].0, published[1].0);
    }

    #[test]
    fn test_close_publishes_remainder_once_and_rejects_work() {
        let recorder = Recorder::default();
        let cache = cache(10, &recorder);
        cache.add("x").unwrap();
        cache.add("y").unwrap();

        match cache.close().unwrap() {
            FlushStatus::Published(report) => assert_eq!(report.records, 2),
            other => panic!("expected a published batch, got {:?}", other),
        }
        assert!(matches!(cache.close().unwrap(), FlushStatus::Empty));
        assert!(cache.is_closed());
        assert!(matches!(cache.add("z"), Err(CacheError::Closed(_))));
        assert!(matches!(
            cache.flush_and_publish(true, false),
            Err(CacheError::Closed(_))
        ));

        let published = recorder.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, "xy");
    }

    #[test]
    fn test_blocking_flush_surfaces_failure_without_retry() {
        let recorder = Recorder::default();
        let mut publisher = MockPublisher::new(&recorder);
        publisher.fail_end = true;
        let cache = EventCache::new("failing", 2, Duration::ZERO, publisher).unwrap();

        cache.add("a").unwrap();
        let err = cache.flush_and_publish(true, false).unwrap_err();
        assert!(matches!(err, CacheError::Publish(_)));

        // Threshold flush fails silently for the producer.
        cache.add("b").unwrap();
        cache.add("c").unwrap();
        cache.close().unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.batches_failed, 2);
        assert_eq!(metrics.batches_published, 0);
        assert_eq!(recorder.published().len(), 2);
    }

    #[test]
    fn test_concurrent_producers_serialized_and_conserved() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 250;

        let recorder = Recorder::default();
        let mut publisher = MockPublisher::new(&recorder);
        publisher.delay = Duration::from_millis(1);
        let cache = Arc::new(EventCache::new("concurrent", 7, Duration::ZERO, publisher).unwrap());

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        cache.add(&format!("{}-{}\n", p, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        cache.close().unwrap();

        assert_eq!(recorder.overlaps.load(Ordering::SeqCst), 0);

        let published = recorder.published();
        let lines: usize = published.iter().map(|(_, t)| t.lines().count()).sum();
        assert_eq!(lines, PRODUCERS * PER_PRODUCER);

        let mut all: Vec<String> = published
            .iter()
            .flat_map(|(_, t)| t.lines().map(str::to_string).collect::<Vec<_>>())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);

        let metrics = cache.metrics();
        assert_eq!(metrics.records_added, (PRODUCERS * PER_PRODUCER) as u64);
        assert_eq!(metrics.records_published, (PRODUCERS * PER_PRODUCER) as u64);
    }

    #[test]
    fn test_auto_flush_ticks_reuse_one_context() {
        let recorder = Recorder::default();
        let cache = EventCache::new(
            "timer",
            100,
            Duration::from_millis(40),
            MockPublisher::new(&recorder),
        )
        .unwrap();

        cache.add("tick\n").unwrap();
        thread::sleep(Duration::from_millis(220));
        assert_eq!(cache.buffered_records(), 1);
        cache.close().unwrap();

        let published = recorder.published();
        assert!(published.len() >= 3, "got {} publishes", published.len());
        let first = published[0].0;
        assert!(published.iter().all(|(id, text)| *id == first && text == "tick\n"));
        assert!(cache.stats().reused_contexts >= 2);
    }

    #[test]
    fn test_publisher_runs_on_named_worker() {
        let recorder = Recorder::default();
        let cache = cache(1, &recorder);
        assert!(!is_publish_thread());

        cache.add("a").unwrap();
        cache.close().unwrap();
        assert!(recorder.on_publish_thread.load(Ordering::SeqCst));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let recorder = Recorder::default();
        let result = EventCache::new("zero", 0, Duration::ZERO, MockPublisher::new(&recorder));
        assert!(matches!(result, Err(CacheError::InvalidCapacity(0))));
    }

    #[test]
    fn test_drop_publishes_remainder() {
        let recorder = Recorder::default();
        {
            let cache = cache(10, &recorder);
            cache.add("last").unwrap();
        }
        assert_eq!(recorder.published().len(), 1);
        assert_eq!(recorder.published()[0].1, "last");
    }

    fn published(status: FlushStatus) -> PublishReport {
        match status {
            FlushStatus::Published(report) => report,
            other => panic!("expected a published batch, got {:?}", other),
        }
    }

    #[test]
    fn test_panicking_publish_is_contained_on_worker() {
        let recorder = Recorder::default();
        let mut publisher = MockPublisher::new(&recorder);
        publisher.panic_at_end = Some(0);
        let cache = EventCache::new("test", 10, Duration::ZERO, publisher).unwrap();

        cache.add("a").unwrap();
        let err = cache.flush_and_publish(true, false).unwrap_err();
        assert!(matches!(
            err,
            CacheError::Publish(PublishError::Panicked { ref message, .. })
                if message.contains("sink exploded")
        ));

        // Worker is still serving jobs.
        cache.add("b").unwrap();
        let report = published(cache.flush_and_publish(true, false).unwrap());
        assert_eq!(report.records, 1);
        assert!(!report.reused_context);

        let metrics = cache.metrics();
        assert_eq!(metrics.batches_failed, 1);
        assert_eq!(metrics.batches_published, 1);
        assert_eq!(cache.stats().failed_batches, 1);
        assert_eq!(recorder.published().last().unwrap().1, "b");
    }

    #[test]
    fn test_threshold_publish_after_panic_reaches_sinks() {
        let recorder = Recorder::default();
        let mut publisher = MockPublisher::new(&recorder);
        publisher.panic_at_end = Some(0);
        let cache = EventCache::new("test", 1, Duration::ZERO, publisher).unwrap();

        cache.add("a").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        cache.add("b").unwrap();
        cache.close().unwrap();

        let texts: Vec<_> = recorder.published().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(cache.metrics().batches_failed, 1);
        assert_eq!(cache.metrics().batches_published, 1);
    }

    #[test]
    fn test_panic_drops_retained_context() {
        let recorder = Recorder::default();
        let mut publisher = MockPublisher::new(&recorder);
        publisher.panic_at_end = Some(1);
        let cache = EventCache::new("test", 10, Duration::ZERO, publisher).unwrap();

        cache.add("a").unwrap();
        let first = published(cache.flush_and_publish(true, true).unwrap());
        assert!(cache.flush_and_publish(true, true).is_err());

        let next = published(cache.flush_and_publish(true, false).unwrap());
        assert!(!next.reused_context);
        assert_ne!(next.batch_id, first.batch_id);
    }

    #[test]
    fn test_rejected_keep_open_start_is_not_retained() {
        let recorder = Recorder::default();
        let mut publisher = MockPublisher::new(&recorder);
        publisher.reject_starts = 1;
        let cache = EventCache::new("test", 10, Duration::ZERO, publisher).unwrap();

        cache.add("a").unwrap();
        let err = cache.flush_and_publish(true, true).unwrap_err();
        assert!(matches!(
            err,
            CacheError::Publish(PublishError::InvalidTransition { .. })
        ));
        let Some(Event::Rejected(rejected)) = recorder.events().first().cloned() else {
            panic!("expected the rejected start to be recorded");
        };

        let next = published(cache.flush_and_publish(true, true).unwrap());
        assert!(!next.reused_context);
        assert_ne!(next.batch_id, rejected);
        assert_eq!(recorder.published(), vec![(next.batch_id, "a".to_string())]);
    }
}
