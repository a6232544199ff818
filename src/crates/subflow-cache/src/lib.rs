//! # subflow-cache - Content-Addressed Result Memoization
//!
//! **Fingerprinting, compressed storage, and invalidation** for per-item
//! subgraph results. This crate is the memoization layer of subflow: it
//! decides whether an item's result is already known, keeps known results
//! compact, and throws everything away the moment the subgraph's definition
//! changes.
//!
//! ## Overview
//!
//! Results are addressed by **content, not position**:
//!
//! - **Fingerprints** - SHA-256 over the canonical JSON serialization of
//!   `{graph, item}` identifies a result regardless of where the item sat in
//!   its batch
//! - **Compressed values** - results are stored as gzip + base64 text, so a
//!   long-lived store holding many results stays small
//! - **Snapshot invalidation** - each entry remembers a fingerprint of the
//!   subgraph definition it was computed against; any definition change
//!   clears the entry before the next lookup
//! - **TTL expiry** - entries are eligible for removal a fixed interval
//!   after creation (one hour by default, tunable via [`CacheConfig`]) and
//!   are swept opportunistically, never on a timer
//!
//! ## Core Concepts
//!
//! ### 1. ResultCache
//!
//! [`ResultCache`] is process-wide state mapping a **subgraph-instance
//! identity key** to a [`CacheEntry`]. The key belongs to the engine node
//! instance that owns the results, not to the subgraph: two nodes iterating
//! the same subgraph keep independent entries.
//!
//! ### 2. Read-Modify-Write Entries
//!
//! An invocation takes an entry out once, shares it across all of its
//! concurrent tasks (clones share one result map), and commits it back once
//! at the end. Cross-invocation races on the same key resolve last-wins;
//! the cache is best-effort, never load-bearing for correctness.
//!
//! ### 3. Codec Failure Policy
//!
//! Encoding and decoding failures are [`CacheError`]s, but they never cost
//! a computed result: callers skip caching when encode fails and treat a
//! failed decode as a cache miss.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use subflow_cache::{fingerprint, DefinitionSnapshot, ObjectCodec, ResultCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ResultCache::new();
//!     let codec = ObjectCodec::new();
//!
//!     // One entry per engine-node instance, validated against the
//!     // subgraph definition it was filled from.
//!     let snapshot = DefinitionSnapshot::of(&json!({"nodes": [{"id": 1}]}))?;
//!     let entry = store.get_or_create("engine-node-1", &snapshot).await;
//!
//!     // Results are keyed by content fingerprint and stored compressed.
//!     let key = fingerprint(&json!({"graph": "sub-1", "item": {"a": 1}}))?;
//!     entry.insert(key.clone(), codec.encode(&json!({"a": 2}))?).await;
//!
//!     // Commit once per invocation; later invocations see the results.
//!     store.commit("engine-node-1", entry).await;
//!
//!     let entry = store.get_or_create("engine-node-1", &snapshot).await;
//!     let hit = entry.lookup(&key).await.expect("cached");
//!     assert_eq!(codec.decode(&hit)?, json!({"a": 2}));
//!     Ok(())
//! }
//! ```
//!
//! ## See Also
//!
//! - `subflow-core` - the iteration engine driving this store

pub mod codec;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod store;

pub use codec::ObjectCodec;
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use fingerprint::{fingerprint, DefinitionSnapshot};
pub use store::{CacheConfig, ResultCache};
