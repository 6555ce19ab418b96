//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> appender -> 缓存 -> 扇出 -> sinks 的端到端测试

#[cfg(test)]
mod contract_tests {
    use contracts::{BatchContext, BatchState};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_batch_lifecycle_snapshot() {
        let mut ctx = BatchContext::new("x.log", None, vec![], false);
        for next in [
            BatchState::Started,
            BatchState::Appended,
            BatchState::Ended,
            BatchState::Started,
        ] {
            ctx.advance(next).unwrap();
        }
        assert_eq!(ctx.advance(BatchState::Created), Err(BatchState::Started));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Read;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use appender::{FlushStatus, LogAppender};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ShipperConfig, SinkConfig, SinkType};
    use event_cache::{CacheError, EventCache};
    use flate2::read::GzDecoder;
    use publisher::{FanOutPublisher, FileSink, PublisherBuilder, PublisherSettings};
    use tempfile::tempdir;

    fn files_under(dir: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(d) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&d) else {
                continue;
            };
            for entry in entries {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    out.push(path);
                }
            }
        }
        out.sort();
        out
    }

    fn gunzip(path: &Path) -> String {
        let raw = std::fs::read(path).unwrap();
        let mut out = String::new();
        GzDecoder::new(&raw[..]).read_to_string(&mut out).unwrap();
        out
    }

    fn load(toml: &str) -> ShipperConfig {
        ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap()
    }

    /// End-to-end: config -> LogAppender -> EventCache -> FanOutPublisher -> sinks
    ///
    /// 验证完整的数据流：
    /// 1. TOML 配置解析与验证
    /// 2. 关闭时同步发布剩余记录
    /// 3. 文件 sink 与本地对象存储 sink 收到相同的压缩批次
    #[test]
    fn test_e2e_shutdown_publishes_to_every_sink() {
        let files = tempdir().unwrap();
        let objects = tempdir().unwrap();
        let config = load(&format!(
            r#"
[cache]
name = "e2e"
capacity = 100
host = "web01"
tags = ["MainSite", "Production"]

[[sinks]]
name = "console"
sink_type = "log"

[[sinks]]
name = "disk"
sink_type = "file"
[sinks.params]
base_path = "{}"

[[sinks]]
name = "archive"
sink_type = "object_store"
[sinks.params]
backend = "local"
root = "{}"
prefix = "logs"
"#,
            files.path().display(),
            objects.path().display()
        ));

        let appender = LogAppender::initialize(&config).unwrap();
        for i in 0..5 {
            assert!(appender.append(&format!("line {}", i)).unwrap());
        }
        let FlushStatus::Published(report) = appender.shutdown().unwrap() else {
            panic!("expected the remainder to be published");
        };
        assert_eq!(report.records, 5);
        assert!(report.batch.ends_with("_web01_e2e.log.gz"));

        let expected: String = (0..5).map(|i| format!("line {}\n", i)).collect();

        let written = files_under(files.path());
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], files.path().join(&report.batch));
        assert_eq!(gunzip(&written[0]), expected);

        let uploaded = objects.path().join("logs").join(&report.batch);
        assert_eq!(gunzip(&uploaded), expected);
        assert!(objects.path().join("logs/.log-shipper").exists());

        for (name, metrics) in appender.sink_metrics() {
            assert_eq!(metrics.ended_count, 1, "sink {}", name);
            assert_eq!(metrics.failure_count, 0, "sink {}", name);
        }
    }

    /// Keep-open: 定时刷新反复重写同一个批次对象
    #[test]
    fn test_e2e_auto_flush_rewrites_one_batch() {
        let files = tempdir().unwrap();
        let config = load(&format!(
            r#"
[cache]
name = "timer"
capacity = 1000
auto_flush_interval_secs = 1
compress = false

[[sinks]]
name = "disk"
sink_type = "file"
[sinks.params]
base_path = "{}"
"#,
            files.path().display()
        ));

        let appender = LogAppender::initialize(&config).unwrap();
        appender.append("early").unwrap();
        thread::sleep(Duration::from_millis(1600));

        let written = files_under(files.path());
        assert_eq!(written.len(), 1);
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "early\n");

        appender.append("late").unwrap();
        let FlushStatus::Published(report) = appender.shutdown().unwrap() else {
            panic!("expected the remainder to be published");
        };
        assert!(report.reused_context);

        assert_eq!(files_under(files.path()), written);
        assert_eq!(
            std::fs::read_to_string(&written[0]).unwrap(),
            "early\nlate\n"
        );
    }

    /// 失败的 sink 不影响其他 sink，阻塞刷新返回错误
    #[test]
    fn test_e2e_broken_sink_is_isolated() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken");
        let healthy = dir.path().join("healthy");

        let settings = PublisherSettings {
            host: None,
            tags: vec![],
            compress: false,
            local_time: false,
        };
        let publisher: FanOutPublisher = PublisherBuilder::new(settings)
            .sink(FileSink::from_params(
                "broken",
                &[("base_path".to_string(), broken.display().to_string())].into(),
            )
            .unwrap())
            .sink_from_config(&SinkConfig {
                name: "healthy".to_string(),
                sink_type: SinkType::File,
                params: [("base_path".to_string(), healthy.display().to_string())].into(),
            })
            .unwrap()
            .build();

        // Replace the directory with a plain file so preparation fails.
        std::fs::remove_dir(&broken).unwrap();
        std::fs::write(&broken, b"not a directory").unwrap();

        let cache = EventCache::new("iso", 10, Duration::ZERO, publisher).unwrap();
        cache.add("kept\n").unwrap();

        let err = cache.flush_and_publish(true, false).unwrap_err();
        let CacheError::Publish(publish) = err else {
            panic!("expected a publish error, got {:?}", err);
        };
        assert_eq!(publish.failures().len(), 1);
        assert_eq!(publish.failures()[0].sink_name, "broken");

        let written = files_under(&healthy);
        assert_eq!(written.len(), 1);
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "kept\n");

        // Dropped, not retried.
        assert!(matches!(cache.close().unwrap(), FlushStatus::Empty));
        assert_eq!(cache.metrics().batches_failed, 1);
    }

    /// 并发生产者：记录数守恒，批次数与 sink 调用一致
    #[test]
    fn test_e2e_concurrent_producers_conserve_records() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;

        let config = load(
            r#"
[cache]
name = "load"
capacity = 50
compress = false

[[sinks]]
name = "console"
sink_type = "log"

[[sinks]]
name = "mem"
sink_type = "object_store"
[sinks.params]
backend = "memory"
"#,
        );
        let appender = Arc::new(LogAppender::initialize(&config).unwrap());

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let appender = Arc::clone(&appender);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        appender.append(&format!("{}:{}", p, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        appender.shutdown().unwrap();

        let total = (PRODUCERS * PER_PRODUCER) as u64;
        let metrics = appender.metrics();
        assert_eq!(metrics.records_added, total);
        assert_eq!(metrics.records_published, total);
        assert_eq!(metrics.batches_published, total / 50);
        assert_eq!(metrics.batches_failed, 0);

        let stats = appender.stats();
        assert_eq!(stats.published_records, total);

        for (name, sink) in appender.sink_metrics() {
            assert_eq!(sink.ended_count, total / 50, "sink {}", name);
            assert_eq!(sink.append_count, total / 50, "sink {}", name);
        }
    }
}
