//! Content fingerprinting for cache keys and change detection
//!
//! A fingerprint is the SHA-256 digest of a value's canonical JSON
//! serialization, rendered as lowercase hex. The same fingerprint function
//! serves two purposes:
//!
//! - **Cache keys** - each batch item is fingerprinted together with its
//!   graph reference to address its memoized result
//! - **Change detection** - a subgraph's full node-data set is fingerprinted
//!   into a [`DefinitionSnapshot`]; a snapshot mismatch invalidates every
//!   cached result for that entry
//!
//! Object keys serialize in sorted order (serde_json's `Map` is backed by a
//! `BTreeMap`), so two mappings holding the same fields in different
//! insertion order produce the same fingerprint and share cached results.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Compute the content fingerprint of any serializable value.
///
/// Deterministic within and across processes for the same structural
/// content. Fails only if the value cannot be serialized to JSON.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use subflow_cache::fingerprint;
///
/// let a = fingerprint(&json!({"x": 1, "y": 2})).unwrap();
/// let b = fingerprint(&json!({"y": 2, "x": 1})).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    Ok(format!("{digest:x}"))
}

/// Fingerprint of a subgraph's full definition, used purely as a
/// change-detector. Never used as a cache key itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionSnapshot(String);

impl DefinitionSnapshot {
    /// Snapshot a subgraph definition (its full node-data set).
    pub fn of<T: Serialize>(definition: &T) -> Result<Self> {
        Ok(DefinitionSnapshot(fingerprint(definition)?))
    }

    /// The underlying hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DefinitionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
