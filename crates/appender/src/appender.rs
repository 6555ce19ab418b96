//! LogAppender - lifecycle wrapper feeding formatted records to an event cache

use std::sync::Arc;
use std::time::Duration;

use contracts::ShipperConfig;
use event_cache::{is_publish_thread, CacheMetricsSnapshot, EventCache, FlushStatus};
use observability::PublishStats;
use publisher::{FanOutPublisher, MetricsSnapshot, PublisherSettings, SinkMetrics};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppenderError;

/// Terminator appended to every record
pub const LINE_SEPARATOR: &str = "\n";

/// Random cache name: both halves of a v4 UUID in base 36
pub fn generate_cache_name() -> String {
    let (hi, lo) = Uuid::new_v4().as_u64_pair();
    format!("{}{}", to_base36(hi), to_base36(lo))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Host label for batch names
///
/// An explicit label wins; otherwise the local hostname when requested.
pub fn resolve_host(
    explicit: Option<&str>,
    report_hostname: bool,
) -> Result<Option<String>, AppenderError> {
    if let Some(host) = explicit.map(str::trim).filter(|h| !h.is_empty()) {
        return Ok(Some(host.to_string()));
    }
    if !report_hostname {
        return Ok(None);
    }
    let host = hostname::get().map_err(AppenderError::Hostname)?;
    Ok(Some(host.to_string_lossy().into_owned()))
}

/// Log appender shipping batches of records to the configured sinks
pub struct LogAppender {
    cache: EventCache,
    sink_metrics: Vec<(String, Arc<SinkMetrics>)>,
}

impl LogAppender {
    /// Build the publisher and event cache from a validated configuration
    #[instrument(name = "appender_initialize", skip(config), fields(sinks = config.sinks.len()))]
    pub fn initialize(config: &ShipperConfig) -> Result<Self, AppenderError> {
        let settings = PublisherSettings {
            host: resolve_host(config.cache.host.as_deref(), config.cache.report_hostname)?,
            tags: config.cache.tags.clone(),
            compress: config.cache.compress,
            local_time: config.cache.local_time,
        };
        if config.sinks.is_empty() {
            warn!("No sinks configured, batches will be discarded");
        }

        let publisher = FanOutPublisher::from_config(settings.clone(), &config.sinks)?;
        let sink_metrics = publisher.metrics_handles();

        let name = config
            .cache
            .name
            .clone()
            .unwrap_or_else(generate_cache_name);
        let cache = EventCache::new(
            name,
            config.cache.capacity,
            Duration::from_secs(config.cache.auto_flush_interval_secs),
            publisher,
        )?;

        info!(
            cache = %cache.name(),
            host = settings.host.as_deref().unwrap_or("-"),
            tags = ?settings.tags,
            compress = settings.compress,
            "Log appender initialized"
        );
        Ok(Self {
            cache,
            sink_metrics,
        })
    }

    pub fn cache_name(&self) -> &str {
        self.cache.name()
    }

    /// Buffer one formatted record
    ///
    /// Returns `false` when the record was produced by the publishing path
    /// and dropped to avoid a feedback loop.
    pub fn append(&self, record: &str) -> Result<bool, AppenderError> {
        if is_publish_thread() {
            return Ok(false);
        }
        let mut line = String::with_capacity(record.len() + LINE_SEPARATOR.len());
        line.push_str(record);
        line.push_str(LINE_SEPARATOR);
        self.cache.add(&line)?;
        Ok(true)
    }

    /// Blocking, non-keep-open flush of whatever is buffered
    pub fn flush(&self) -> Result<FlushStatus, AppenderError> {
        Ok(self.cache.flush_and_publish(true, false)?)
    }

    /// Publish the remainder and stop the worker; later calls are no-ops
    pub fn shutdown(&self) -> Result<FlushStatus, AppenderError> {
        Ok(self.cache.close()?)
    }

    pub fn is_shut_down(&self) -> bool {
        self.cache.is_closed()
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.cache.metrics()
    }

    pub fn stats(&self) -> PublishStats {
        self.cache.stats()
    }

    /// Per-sink counters, in fan-out order
    pub fn sink_metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sink_metrics
            .iter()
            .map(|(name, m)| (name.clone(), m.snapshot()))
            .collect()
    }
}
