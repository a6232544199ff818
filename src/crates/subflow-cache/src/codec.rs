//! Compressed codec for cached result values
//!
//! Cached results are stored as text: canonical JSON, gzip-compressed, then
//! base64-encoded. [`ObjectCodec::decode`] reverses [`ObjectCodec::encode`]
//! exactly, so `decode(encode(v)) == v` for every value the canonical
//! serialization can represent.
//!
//! Encoding failure is a hard error (a result must never be silently
//! truncated on the way into the cache). Decoding a corrupted or empty
//! string is an error as well, never a partial value; callers treat it as a
//! cache miss and recompute.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Reversible compression of structured values into cache-safe strings
#[derive(Debug, Clone, Default)]
pub struct ObjectCodec;

impl ObjectCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode a value into a compressed base64 string.
    pub fn encode(&self, value: &Value) -> Result<String> {
        let json = serde_json::to_vec(value)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| CacheError::encode(format!("compression failed: {e}")))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CacheError::encode(format!("compression failed: {e}")))?;
        Ok(BASE64.encode(compressed))
    }

    /// Decode a previously encoded string back into its value.
    pub fn decode(&self, encoded: &str) -> Result<Value> {
        let compressed = BASE64
            .decode(encoded)
            .map_err(|e| CacheError::decode(format!("invalid base64: {e}")))?;
        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .map_err(|e| CacheError::decode(format!("decompression failed: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| CacheError::decode(format!("invalid payload: {e}")))
    }
}
