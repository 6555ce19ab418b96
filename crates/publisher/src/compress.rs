//! Gzip payload helper shared by the sinks

use std::io::Write;

use contracts::ContractError;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Gzip `data` with the default compression level
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, ContractError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ContractError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ContractError::Compression(e.to_string()))
}

/// Encode a batch payload, gzipping when `compress` is set
pub fn encode_payload(text: String, compress: bool) -> Result<Vec<u8>, ContractError> {
    if compress {
        gzip(text.as_bytes())
    } else {
        Ok(text.into_bytes())
    }
}
