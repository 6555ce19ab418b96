//! FileSink - writes each batch to one file under a base directory

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use contracts::{BatchContext, BatchSink, ContractError};
use tracing::{debug, error, instrument};

use crate::compress::encode_payload;

/// Context attribute holding the path of the last written file
pub const FILE_PATH_ATTRIBUTE: &str = "file.path";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Sink that writes batches to disk files
///
/// The batch name is used as a relative path, so the date partition of the
/// name becomes a directory tree below `base_path`.
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    created_dirs: HashSet<PathBuf>,
    buffer: String,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            created_dirs: HashSet::new(),
            buffer: String::new(),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    async fn ensure_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        if !self.created_dirs.contains(dir) {
            tokio::fs::create_dir_all(dir).await?;
            self.created_dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    async fn write_batch(&mut self, ctx: &BatchContext) -> Result<PathBuf, ContractError> {
        let path = self.config.base_path.join(ctx.name());
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent).await?;
        }

        let payload = encode_payload(std::mem::take(&mut self.buffer), ctx.compress())?;
        tokio::fs::write(&path, payload).await?;
        Ok(path)
    }
}

impl BatchSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink_start", skip(self, ctx), fields(sink = %self.name, batch = %ctx.name()))]
    async fn start(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        self.buffer.clear();
        let base = self.config.base_path.clone();
        self.ensure_dir(&base).await.map_err(|e| {
            ContractError::sink_prepare(&self.name, format!("{}: {}", base.display(), e))
        })
    }

    async fn append(&mut self, _ctx: &mut BatchContext, text: &str) -> Result<(), ContractError> {
        self.buffer.push_str(text);
        Ok(())
    }

    #[instrument(name = "file_sink_end", skip(self, ctx), fields(sink = %self.name, batch = %ctx.name()))]
    async fn end(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        match self.write_batch(ctx).await {
            Ok(path) => {
                debug!(sink = %self.name, path = %path.display(), "Batch written");
                ctx.set_attribute(FILE_PATH_ATTRIBUTE, path.to_string_lossy());
                Ok(())
            }
            Err(e) => {
                self.buffer.clear();
                error!(sink = %self.name, batch = %ctx.name(), error = %e, "Write failed");
                Err(ContractError::sink_write(&self.name, e.to_string()))
            }
        }
    }
}
