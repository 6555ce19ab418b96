//! Configuration validation
//!
//! Rules:
//! - cache.capacity > 0, flush interval bounded (validator derive)
//! - cache.name not blank when given, and no path separators or `..`
//! - sink names non-empty and unique
//! - object_store sinks carry the parameters their backend needs

use std::collections::HashSet;

use contracts::{CacheConfig, ContractError, ShipperConfig, SinkConfig, SinkType};
use validator::Validate;

/// Validate a ShipperConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ShipperConfig) -> Result<(), ContractError> {
    validate_cache(&config.cache)?;
    validate_sink_names(config)?;
    for (idx, sink) in config.sinks.iter().enumerate() {
        validate_sink_params(idx, sink)?;
    }
    Ok(())
}

fn validate_cache(cache: &CacheConfig) -> Result<(), ContractError> {
    if let Err(errors) = cache.validate() {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .map(|e| e.code.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                (format!("cache.{field}"), format!("out of range ({detail})"))
            })
            .unwrap_or_else(|| ("cache".to_string(), errors.to_string()));
        return Err(ContractError::config_validation(field, message));
    }

    if let Some(name) = &cache.name {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                "cache.name",
                "cache name cannot be blank",
            ));
        }
        // The name becomes the last segment of every batch key.
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(ContractError::config_validation(
                "cache.name",
                "cache name cannot contain '/', '\\' or '..'",
            ));
        }
    }
    Ok(())
}

fn validate_sink_names(config: &ShipperConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_sink_params(idx: usize, sink: &SinkConfig) -> Result<(), ContractError> {
    if sink.sink_type != SinkType::ObjectStore {
        return Ok(());
    }

    let backend = sink.params.get("backend").map(String::as_str).unwrap_or("s3");
    let required: &[&str] = match backend {
        "s3" => &["path"],
        "local" => &["root"],
        "memory" => &[],
        other => {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.backend", idx),
                format!("unknown object store backend '{other}'"),
            ))
        }
    };

    for key in required {
        if sink.params.get(*key).is_none_or(|v| v.trim().is_empty()) {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.{}", idx, key),
                format!("'{key}' is required for the {backend} backend"),
            ));
        }
    }

    if backend == "s3" {
        let path = &sink.params["path"];
        if path.split('/').next().is_none_or(str::is_empty) {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", idx),
                "path must start with a bucket name",
            ));
        }
    }
    Ok(())
}
