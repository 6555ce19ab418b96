//! 发布指标收集模块
//!
//! 记录批量缓存与 sink 扇出的运行指标，并在内存中聚合发布统计。

use metrics::{counter, gauge, histogram};

/// 记录一条日志记录进入缓存
pub fn record_record_added(cache: &str) {
    counter!(
        "log_shipper_records_added_total",
        "cache" => cache.to_string()
    )
    .increment(1);
}

/// 记录缓冲区深度 (当前未发布的记录数)
pub fn record_buffer_depth(cache: &str, depth: usize) {
    gauge!(
        "log_shipper_buffer_depth",
        "cache" => cache.to_string()
    )
    .set(depth as f64);
}

/// 记录一个批次发布成功
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_batch_published;
///
/// record_batch_published("app", report.records, report.bytes, elapsed_ms);
/// ```
pub fn record_batch_published(cache: &str, records: usize, bytes: usize, latency_ms: f64) {
    counter!(
        "log_shipper_batches_published_total",
        "cache" => cache.to_string()
    )
    .increment(1);
    histogram!("log_shipper_batch_records").record(records as f64);
    histogram!("log_shipper_batch_bytes").record(bytes as f64);
    histogram!("log_shipper_publish_latency_ms").record(latency_ms);
}

/// 记录一个批次发布失败
pub fn record_batch_failed(cache: &str) {
    counter!(
        "log_shipper_batches_failed_total",
        "cache" => cache.to_string()
    )
    .increment(1);
}

/// 记录空刷新 (缓冲区为空，未发布)
pub fn record_empty_flush(cache: &str) {
    counter!(
        "log_shipper_empty_flushes_total",
        "cache" => cache.to_string()
    )
    .increment(1);
}

/// 记录单个 sink 的阶段结果
pub fn record_sink_phase(sink_name: &str, phase: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "log_shipper_sink_phase_total",
        "sink" => sink_name.to_string(),
        "phase" => phase.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 发布统计聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct PublishStats {
    /// 成功发布的批次数
    pub published_batches: u64,

    /// 失败的批次数
    pub failed_batches: u64,

    /// 复用 keep-open 上下文的批次数
    pub reused_contexts: u64,

    /// 空刷新次数
    pub empty_flushes: u64,

    /// 已发布记录总数
    pub published_records: u64,

    /// 已发布字节总数 (压缩前)
    pub published_bytes: u64,

    /// 单批次记录数统计
    pub batch_records: RunningStats,

    /// 发布延迟统计 (毫秒)
    pub latency_ms: RunningStats,
}

impl PublishStats {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新一次成功发布
    pub fn record_success(&mut self, records: usize, bytes: usize, latency_ms: f64, reused: bool) {
        self.published_batches += 1;
        self.published_records += records as u64;
        self.published_bytes += bytes as u64;
        if reused {
            self.reused_contexts += 1;
        }
        self.batch_records.push(records as f64);
        self.latency_ms.push(latency_ms);
    }

    /// 更新一次失败发布
    pub fn record_failure(&mut self, latency_ms: f64) {
        self.failed_batches += 1;
        self.latency_ms.push(latency_ms);
    }

    /// 更新一次空刷新
    pub fn record_empty(&mut self) {
        self.empty_flushes += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> PublishSummary {
        let attempted = self.published_batches + self.failed_batches;
        PublishSummary {
            published_batches: self.published_batches,
            failed_batches: self.failed_batches,
            reused_contexts: self.reused_contexts,
            empty_flushes: self.empty_flushes,
            published_records: self.published_records,
            published_bytes: self.published_bytes,
            failure_rate: if attempted > 0 {
                self.failed_batches as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            batch_records: StatsSummary::from(&self.batch_records),
            latency_ms: StatsSummary::from(&self.latency_ms),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 发布摘要
#[derive(Debug, Clone, Default)]
pub struct PublishSummary {
    pub published_batches: u64,
    pub failed_batches: u64,
    pub reused_contexts: u64,
    pub empty_flushes: u64,
    pub published_records: u64,
    pub published_bytes: u64,
    pub failure_rate: f64,
    pub batch_records: StatsSummary,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for PublishSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Publish Summary ===")?;
        writeln!(f, "Published batches: {}", self.published_batches)?;
        writeln!(
            f,
            "Failed batches: {} ({:.2}%)",
            self.failed_batches, self.failure_rate
        )?;
        writeln!(f, "Reused contexts: {}", self.reused_contexts)?;
        writeln!(f, "Empty flushes: {}", self.empty_flushes)?;
        writeln!(
            f,
            "Published records: {} ({} bytes)",
            self.published_records, self.published_bytes
        )?;
        writeln!(f, "Records per batch: {}", self.batch_records)?;
        writeln!(f, "Publish latency (ms): {}", self.latency_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
