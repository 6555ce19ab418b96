//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::ShipperConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Parameter keys whose values are never printed
const SECRET_PARAMS: &[&str] = &["access_key_id", "secret_access_key"];

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    cache: CacheInfo,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct CacheInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    capacity: usize,
    auto_flush_interval_secs: u64,
    compress: bool,
    report_hostname: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args.sinks);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn redact(key: &str, value: &str) -> String {
    if SECRET_PARAMS.contains(&key) {
        "***".to_string()
    } else {
        value.to_string()
    }
}

fn build_config_info(config: &ShipperConfig, with_params: bool) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", config.version),
        cache: CacheInfo {
            name: config.cache.name.clone(),
            capacity: config.cache.capacity,
            auto_flush_interval_secs: config.cache.auto_flush_interval_secs,
            compress: config.cache.compress,
            report_hostname: config.cache.report_hostname,
            host: config.cache.host.clone(),
            tags: config.cache.tags.clone(),
        },
        sinks: config
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                params: if with_params {
                    s.params
                        .iter()
                        .map(|(k, v)| (k.clone(), redact(k, v)))
                        .collect()
                } else {
                    BTreeMap::new()
                },
            })
            .collect(),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Log Shipper Configuration ===\n");
    println!("Version: {}", info.version);

    println!("\nCache:");
    println!(
        "  Name: {}",
        info.cache.name.as_deref().unwrap_or("<generated>")
    );
    println!("  Capacity: {} records", info.cache.capacity);
    println!("  Auto-flush: {}s", info.cache.auto_flush_interval_secs);
    println!("  Compress: {}", info.cache.compress);
    println!("  Report hostname: {}", info.cache.report_hostname);
    if let Some(ref host) = info.cache.host {
        println!("  Host: {}", host);
    }
    if !info.cache.tags.is_empty() {
        println!("  Tags: {}", info.cache.tags.join(", "));
    }

    println!("\nSinks ({}):", info.sinks.len());
    for sink in &info.sinks {
        println!("  - {} ({})", sink.name, sink.sink_type);
        for (key, value) in &sink.params {
            println!("      {} = {}", key, value);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    const CONFIG: &str = r#"
[cache]
capacity = 100
tags = ["MainSite"]

[[sinks]]
name = "archive"
sink_type = "object_store"
[sinks.params]
backend = "s3"
path = "bucket/logs"
secret_access_key = "hunter2"
"#;

    #[test]
    fn test_params_hidden_unless_requested() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let info = build_config_info(&config, false);
        assert!(info.sinks[0].params.is_empty());
        assert_eq!(info.sinks[0].sink_type, "ObjectStore");
    }

    #[test]
    fn test_secrets_redacted() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let info = build_config_info(&config, true);
        let params = &info.sinks[0].params;
        assert_eq!(params["secret_access_key"], "***");
        assert_eq!(params["path"], "bucket/logs");

        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
