//! Error types for the iteration engine
//!
//! Per-item failures never cross the engine boundary individually: they are
//! recovered into task outcomes and aggregated into a single
//! [`EngineError::Batch`] naming every contributing item by index. The other
//! variants reject a run before any task is dispatched.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the iteration engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The batch violated the subgraph's input contract; nothing ran
    #[error("Validation error: {0}")]
    Validation(String),

    /// One or more items failed; the message enumerates each by index
    #[error("Batch execution failed: {0}")]
    Batch(String),

    /// Malformed graph reference or collaborator failure
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cache layer failure
    #[error("Cache error: {0}")]
    Cache(#[from] subflow_cache::CacheError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// Create an aggregated batch error
    pub fn batch(msg: impl Into<String>) -> Self {
        EngineError::Batch(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }
}
