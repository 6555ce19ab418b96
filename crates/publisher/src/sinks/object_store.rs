//! ObjectStoreSink - one object PUT per batch
//!
//! The object key is `<prefix>/<batch name>`. Before the first batch the sink
//! creates a marker object under the prefix so a missing or read-only
//! destination is reported at `start` instead of at the first `end`.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{BatchContext, BatchSink, ContractError};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutMode, PutOptions, PutPayload,
};
use tracing::{debug, error, info, instrument};

use crate::compress::encode_payload;

/// Name of the marker object written under the prefix
pub const PREFIX_MARKER: &str = ".log-shipper";
/// Context attribute holding the key of the last written object
pub const OBJECT_KEY_ATTRIBUTE: &str = "object_store.key";
/// Context attribute holding the e-tag of the last written object
pub const OBJECT_ETAG_ATTRIBUTE: &str = "object_store.e_tag";

const DEFAULT_REGION: &str = "us-east-1";

/// Split `bucket/prefix/...` into a lowercased bucket and a prefix
///
/// The prefix is returned without surrounding slashes; empty means the
/// bucket root.
pub fn split_bucket_path(path: &str) -> Option<(String, String)> {
    let trimmed = path.trim().trim_start_matches('/');
    let (bucket, prefix) = match trimmed.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix),
        None => (trimmed, ""),
    };
    if bucket.is_empty() {
        return None;
    }
    Some((bucket.to_lowercase(), prefix.trim_matches('/').to_string()))
}

/// Parsed parameters of an object store sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreSinkConfig {
    S3 {
        bucket: String,
        prefix: String,
        region: String,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        endpoint: Option<String>,
    },
    Local {
        root: String,
        prefix: String,
    },
    Memory {
        prefix: String,
    },
}

impl ObjectStoreSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let prefix = || {
            params
                .get("prefix")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_default()
        };

        match params.get("backend").map(String::as_str).unwrap_or("s3") {
            "s3" => {
                let path = params
                    .get("path")
                    .ok_or_else(|| "missing 'path' parameter".to_string())?;
                let (bucket, prefix) = split_bucket_path(path)
                    .ok_or_else(|| format!("invalid bucket path '{}'", path))?;
                Ok(Self::S3 {
                    bucket,
                    prefix,
                    region: params
                        .get("region")
                        .cloned()
                        .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                    access_key_id: params.get("access_key_id").cloned(),
                    secret_access_key: params.get("secret_access_key").cloned(),
                    endpoint: params.get("endpoint").cloned(),
                })
            }
            "local" => {
                let root = params
                    .get("root")
                    .ok_or_else(|| "missing 'root' parameter".to_string())?;
                Ok(Self::Local {
                    root: root.clone(),
                    prefix: prefix(),
                })
            }
            "memory" => Ok(Self::Memory { prefix: prefix() }),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }

    /// Build the backing store, its key prefix and whether it takes attributes
    fn build(&self) -> Result<(Arc<dyn ObjectStore>, String, bool), ContractError> {
        match self {
            Self::S3 {
                bucket,
                prefix,
                region,
                access_key_id,
                secret_access_key,
                endpoint,
            } => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_region(region);
                if let Some(key) = access_key_id {
                    builder = builder.with_access_key_id(key);
                }
                if let Some(secret) = secret_access_key {
                    builder = builder.with_secret_access_key(secret);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                Ok((Arc::new(builder.build()?), prefix.clone(), true))
            }
            Self::Local { root, prefix } => {
                std::fs::create_dir_all(root)?;
                let store = LocalFileSystem::new_with_prefix(root)?;
                Ok((Arc::new(store), prefix.clone(), false))
            }
            Self::Memory { prefix } => Ok((Arc::new(InMemory::new()), prefix.clone(), true)),
        }
    }
}

/// Sink that uploads each batch as one object
pub struct ObjectStoreSink {
    name: String,
    store: Arc<dyn ObjectStore>,
    prefix: String,
    content_attributes: bool,
    prefix_ready: bool,
    buffer: String,
}

impl ObjectStoreSink {
    /// Create a sink over an existing store
    ///
    /// `content_attributes` controls whether content type and encoding are
    /// sent with each PUT; not every backend accepts them.
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
        content_attributes: bool,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            content_attributes,
            prefix_ready: false,
            buffer: String::new(),
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = ObjectStoreSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_prepare(&name, e))?;
        let (store, prefix, content_attributes) = config.build()?;
        info!(sink = %name, store = %store, prefix = %prefix, "Object store sink created");
        Ok(Self::new(name, store, prefix, content_attributes))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Object key for a batch name
    pub fn key_for(&self, batch_name: &str) -> Path {
        if self.prefix.is_empty() {
            Path::from(batch_name)
        } else {
            Path::from(format!("{}/{}", self.prefix, batch_name))
        }
    }

    async fn ensure_prefix(&mut self) -> Result<(), ContractError> {
        if self.prefix_ready {
            return Ok(());
        }

        let marker = self.key_for(PREFIX_MARKER);
        let opts = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };
        match self
            .store
            .put_opts(&marker, PutPayload::from_static(b""), opts)
            .await
        {
            Ok(_) => debug!(sink = %self.name, marker = %marker, "Prefix marker created"),
            Err(object_store::Error::AlreadyExists { .. }) => {
                debug!(sink = %self.name, marker = %marker, "Prefix marker already present")
            }
            // Store cannot do conditional puts; the destination is reachable.
            Err(object_store::Error::NotImplemented { .. }) => {}
            Err(e) => {
                return Err(ContractError::sink_prepare(
                    &self.name,
                    format!("{}: {}", marker, e),
                ))
            }
        }
        self.prefix_ready = true;
        Ok(())
    }

    fn put_options(&self, compress: bool) -> PutOptions {
        let mut attributes = Attributes::new();
        if self.content_attributes {
            attributes.insert(Attribute::ContentType, AttributeValue::from("text/plain"));
            if compress {
                attributes.insert(Attribute::ContentEncoding, AttributeValue::from("gzip"));
            }
        }
        PutOptions {
            attributes,
            ..Default::default()
        }
    }
}

impl BatchSink for ObjectStoreSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "object_store_sink_start", skip(self, ctx), fields(sink = %self.name, batch = %ctx.name()))]
    async fn start(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        self.buffer.clear();
        self.ensure_prefix().await
    }

    async fn append(&mut self, _ctx: &mut BatchContext, text: &str) -> Result<(), ContractError> {
        self.buffer.push_str(text);
        Ok(())
    }

    #[instrument(name = "object_store_sink_end", skip(self, ctx), fields(sink = %self.name, batch = %ctx.name()))]
    async fn end(&mut self, ctx: &mut BatchContext) -> Result<(), ContractError> {
        let key = self.key_for(ctx.name());
        let payload = encode_payload(std::mem::take(&mut self.buffer), ctx.compress())?;
        let size = payload.len();

        let opts = self.put_options(ctx.compress());
        match self
            .store
            .put_opts(&key, PutPayload::from(Bytes::from(payload)), opts)
            .await
        {
            Ok(result) => {
                debug!(sink = %self.name, key = %key, size, "Batch uploaded");
                ctx.set_attribute(OBJECT_KEY_ATTRIBUTE, key.to_string());
                if let Some(e_tag) = result.e_tag {
                    ctx.set_attribute(OBJECT_ETAG_ATTRIBUTE, e_tag);
                }
                Ok(())
            }
            Err(e) => {
                error!(sink = %self.name, key = %key, error = %e, "Upload failed");
                Err(ContractError::sink_write(
                    &self.name,
                    format!("{}: {}", key, e),
                ))
            }
        }
    }
}
