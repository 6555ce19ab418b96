//! `run` command implementation.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Instant;

use anyhow::{Context, Result};
use appender::LogAppender;
use contracts::{parse_tags, ShipperConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::stats::RunStats;

/// Execute the `run` command
pub async fn run_shipper(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        capacity = config.cache.capacity,
        auto_flush_secs = config.cache.auto_flush_interval_secs,
        compress = config.cache.compress,
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let appender = LogAppender::initialize(&config).context("Failed to initialize appender")?;
    let input = open_input(args.input.as_deref()).await?;
    let source_name = args
        .input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdin".to_string());

    let started = Instant::now();
    let mut stats = RunStats::default();
    let shutdown_signal = setup_shutdown_signal();

    info!(cache = %appender.cache_name(), input = %source_name, "Shipping started");

    let read_result = ship_lines(
        BufReader::new(input),
        &appender,
        &source_name,
        &mut stats,
        shutdown_signal,
    )
    .await;

    // Close blocks on the final publish.
    let (appender, shutdown) = tokio::task::spawn_blocking(move || {
        let result = appender.shutdown();
        (appender, result)
    })
    .await
    .context("Shutdown task failed")?;

    stats.duration = started.elapsed();
    stats.publish = appender.stats().summary();
    stats.sinks = appender
        .sink_metrics()
        .into_iter()
        .map(|(name, m)| (name, m.started_count, m.ended_count, m.failure_count))
        .collect();
    stats.print_summary();

    read_result?;
    shutdown.map_err(|e| CliError::shutdown(e.to_string()))?;

    info!("Log shipper finished");
    Ok(())
}

/// Feed lines into the appender until end of input, a shutdown signal or an
/// append error
///
/// The appender is only borrowed: the caller always runs the blocking shutdown.
async fn ship_lines<R, F>(
    reader: R,
    appender: &LogAppender,
    source_name: &str,
    stats: &mut RunStats,
    shutdown_signal: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown_signal);
    let mut lines = reader.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    stats.lines_read += 1;
                    match appender.append(&line) {
                        Ok(true) => stats.lines_accepted += 1,
                        Ok(false) => {}
                        Err(e) => {
                            return Err(anyhow::Error::new(e)
                                .context(format!("Failed to append line {}", stats.lines_read)));
                        }
                    }
                }
                Ok(None) => return Ok(()),
                Err(e) => return Err(CliError::input(source_name, e).into()),
            },
            _ = &mut shutdown_signal => {
                warn!("Received shutdown signal, flushing remaining records...");
                stats.interrupted = true;
                return Ok(());
            }
        }
    }
}

/// Apply CLI overrides on top of the loaded configuration
pub(crate) fn apply_overrides(config: &mut ShipperConfig, args: &RunArgs) {
    if let Some(ref name) = args.name {
        info!(name = %name, "Overriding cache name from CLI");
        config.cache.name = Some(name.clone());
    }
    if let Some(capacity) = args.capacity {
        info!(capacity, "Overriding capacity from CLI");
        config.cache.capacity = capacity;
    }
    if let Some(interval) = args.flush_interval {
        info!(interval, "Overriding flush interval from CLI");
        config.cache.auto_flush_interval_secs = interval;
    }
    if let Some(ref tags) = args.tags {
        config.cache.tags = parse_tags(tags);
        info!(tags = ?config.cache.tags, "Overriding tags from CLI");
    }
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding host label from CLI");
        config.cache.host = Some(host.clone());
    }
    if args.no_compress {
        config.cache.compress = false;
    }
}

async fn open_input(path: Option<&Path>) -> Result<Pin<Box<dyn AsyncRead + Send>>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CliError::input(path.display().to_string(), e))?;
            Ok(Box::pin(file))
        }
        None => Ok(Box::pin(tokio::io::stdin())),
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &ShipperConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Cache:");
    println!(
        "  Name: {}",
        config.cache.name.as_deref().unwrap_or("<generated>")
    );
    println!("  Capacity: {}", config.cache.capacity);
    println!(
        "  Auto-flush: {}",
        match config.cache.auto_flush_interval_secs {
            0 => "disabled".to_string(),
            secs => format!("every {}s (keep-open)", secs),
        }
    );
    println!("  Compress: {}", config.cache.compress);
    if let Some(ref host) = config.cache.host {
        println!("  Host: {}", host);
    } else if config.cache.report_hostname {
        println!("  Host: <local hostname>");
    }
    if !config.cache.tags.is_empty() {
        println!("  Tags: {}", config.cache.tags.join(", "));
    }

    println!("\nSinks ({}):", config.sinks.len());
    for sink in &config.sinks {
        println!("  - {} ({:?})", sink.name, sink.sink_type);
    }
    println!();
}
