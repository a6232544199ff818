//! Process-wide result store keyed by subgraph-instance identity
//!
//! [`ResultCache`] is the in-memory reference store for memoized subgraph
//! results. Entries live for the lifetime of the process (or until their
//! TTL elapses and a sweep removes them) and are never persisted to durable
//! storage: a restart loses all cached results.
//!
//! The store is `Arc`-shared internally, so cloning it hands out another
//! handle to the same state. An engine owns (or is handed) one store; many
//! engine instances may share one without interfering, because every entry
//! is scoped by the caller-supplied instance key.
//!
//! Entries move through the store in a read-modify-write cycle: an
//! invocation takes a [`CacheEntry`] out with [`ResultCache::get_or_create`],
//! mutates it through the entry's own operations while tasks run, and writes
//! it back once with [`ResultCache::commit`]. When two invocations race on
//! the same instance key, the one committing last wins; cache entries are
//! best-effort.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::entry::CacheEntry;
use crate::fingerprint::DefinitionSnapshot;

/// Configuration for the result store
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry lives after creation
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// In-memory store mapping instance keys to cache entries
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    config: CacheConfig,
}

impl ResultCache {
    /// Create a store with the default one-hour TTL.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a store with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Return the live entry stored under `instance_key`, or a fresh empty
    /// entry expiring `ttl` from now.
    ///
    /// An expired entry still sitting in the store is treated as absent and
    /// replaced by the fresh one. A fresh entry is not visible to other
    /// invocations until [`ResultCache::commit`] writes it back.
    pub async fn get_or_create(
        &self,
        instance_key: &str,
        snapshot: &DefinitionSnapshot,
    ) -> CacheEntry {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(instance_key) {
                if !entry.is_expired() {
                    return entry.clone();
                }
            }
        }
        tracing::debug!(instance_key, "Creating cache entry");
        CacheEntry::new(snapshot.clone(), self.config.ttl)
    }

    /// Persist an entry back into process-wide state.
    ///
    /// Called once per invocation, after all tasks have finished. The last
    /// commit wins any cross-invocation race on the same instance key.
    pub async fn commit(&self, instance_key: &str, entry: CacheEntry) {
        let results = entry.len().await;
        self.entries
            .write()
            .await
            .insert(instance_key.to_string(), entry);
        tracing::debug!(instance_key, results, "Committed cache entry");
    }

    /// Remove every entry whose expiry lies before `now`.
    ///
    /// Invoked opportunistically after a successful cached invocation, never
    /// on a timer. Returns the number of entries removed.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    /// Number of entries currently stored.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drop every stored entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
