//! ShipperConfig - Config Loader output
//!
//! Describes the complete shipper setup: batching cache parameters and the
//! ordered list of sinks every batch fans out to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Records per batch when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 2000;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete shipper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Batching cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Sinks, in fan-out order
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Batching cache settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// Raw cache name; a random base-36 id is generated when absent
    #[serde(default)]
    pub name: Option<String>,

    /// Records buffered before a batch is forced out, must be > 0
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1))]
    pub capacity: usize,

    /// Keep-open flush period in seconds, 0 disables the timer
    #[serde(default)]
    #[validate(range(max = 86400))]
    pub auto_flush_interval_secs: u64,

    /// Gzip payloads and append `.gz` to batch names
    #[serde(default = "default_compress")]
    pub compress: bool,

    /// Use the local hostname as host label
    #[serde(default)]
    pub report_hostname: bool,

    /// Stamp batch names with local time instead of UTC
    #[serde(default)]
    pub local_time: bool,

    /// Explicit host label, wins over `report_hostname`
    #[serde(default)]
    pub host: Option<String>,

    /// Classification tags attached to every batch
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: None,
            capacity: DEFAULT_CAPACITY,
            auto_flush_interval_secs: 0,
            compress: default_compress(),
            report_hostname: false,
            local_time: false,
            host: None,
            tags: Vec::new(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_compress() -> bool {
    true
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Structured log summary
    Log,
    /// Local or mounted filesystem
    File,
    /// Object storage (S3, local, in-memory)
    ObjectStore,
}

/// Split a `,` / `;` separated tag list, trimming whitespace
///
/// Empty entries are dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
