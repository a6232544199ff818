//! Error types for cache operations

use thiserror::Error;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur during cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value could not be encoded for cache storage
    #[error("Encode error: {0}")]
    Encode(String),

    /// A stored value could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Create an encode error
    pub fn encode(msg: impl Into<String>) -> Self {
        CacheError::Encode(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        CacheError::Decode(msg.into())
    }
}
