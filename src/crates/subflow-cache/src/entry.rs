//! Cache entry shared by one invocation's tasks

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::fingerprint::DefinitionSnapshot;

/// Memoized results for one subgraph-instance identity.
///
/// Maps item fingerprints to compressed results, carries the expiry instant
/// after which the whole entry is eligible for removal, and remembers the
/// [`DefinitionSnapshot`] it was created (or last reconciled) against.
///
/// Cloning is cheap: clones share the underlying result map, so every task
/// of an invocation can hold its own handle while reads and writes land in
/// one place. The snapshot and expiry travel by value and only become
/// visible to other invocations when the entry is committed back to the
/// store.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    results: Arc<RwLock<HashMap<String, String>>>,
    expires_at: Instant,
    snapshot: DefinitionSnapshot,
}

impl CacheEntry {
    /// Create an empty entry that expires `ttl` from now.
    pub fn new(snapshot: DefinitionSnapshot, ttl: Duration) -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
            expires_at: Instant::now() + ttl,
            snapshot,
        }
    }

    /// Clear all results if the definition changed since this entry was
    /// created or last reconciled, and remember the new snapshot.
    ///
    /// Returns `true` if the entry was invalidated. Must run before any
    /// lookup or insert of the invocation that observed `current`.
    pub async fn reconcile(&mut self, current: &DefinitionSnapshot) -> bool {
        if self.snapshot == *current {
            return false;
        }
        self.results.write().await.clear();
        self.snapshot = current.clone();
        true
    }

    /// Fetch the compressed result stored under a fingerprint, if any.
    pub async fn lookup(&self, fingerprint: &str) -> Option<String> {
        self.results.read().await.get(fingerprint).cloned()
    }

    /// Store a compressed result under a fingerprint.
    ///
    /// Safe to call from many concurrent tasks; when two tasks race on the
    /// same fingerprint the later write wins.
    pub async fn insert(&self, fingerprint: String, compressed: String) {
        self.results.write().await.insert(fingerprint, compressed);
    }

    /// The snapshot this entry was last reconciled against.
    pub fn snapshot(&self) -> &DefinitionSnapshot {
        &self.snapshot
    }

    /// The instant after which this entry may be swept.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether this entry has expired relative to `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at < now
    }

    /// Whether this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Number of memoized results.
    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    /// Whether the entry holds no results.
    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(definition: &serde_json::Value) -> DefinitionSnapshot {
        DefinitionSnapshot::of(definition).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_after_insert() {
        let entry = CacheEntry::new(snapshot(&json!({"v": 1})), Duration::from_secs(60));

        assert!(entry.lookup("abc").await.is_none());
        entry.insert("abc".to_string(), "payload".to_string()).await;

        assert_eq!(entry.lookup("abc").await, Some("payload".to_string()));
        assert_eq!(entry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reconcile_keeps_results_for_same_snapshot() {
        let snap = snapshot(&json!({"v": 1}));
        let mut entry = CacheEntry::new(snap.clone(), Duration::from_secs(60));
        entry.insert("abc".to_string(), "payload".to_string()).await;

        let invalidated = entry.reconcile(&snap).await;

        assert!(!invalidated);
        assert_eq!(entry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reconcile_clears_results_on_snapshot_change() {
        let mut entry = CacheEntry::new(snapshot(&json!({"v": 1})), Duration::from_secs(60));
        entry.insert("abc".to_string(), "payload".to_string()).await;

        let changed = snapshot(&json!({"v": 2}));
        let invalidated = entry.reconcile(&changed).await;

        assert!(invalidated);
        assert!(entry.is_empty().await);
        assert_eq!(entry.snapshot(), &changed);
    }

    #[tokio::test]
    async fn test_clones_share_results() {
        let entry = CacheEntry::new(snapshot(&json!({"v": 1})), Duration::from_secs(60));
        let other = entry.clone();

        entry.insert("abc".to_string(), "payload".to_string()).await;

        assert_eq!(other.lookup("abc").await, Some("payload".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_inserts() {
        let entry = CacheEntry::new(snapshot(&json!({"v": 1})), Duration::from_secs(60));

        let mut handles = Vec::new();
        for i in 0..32 {
            let handle = entry.clone();
            handles.push(tokio::spawn(async move {
                handle.insert(format!("fp-{i}"), format!("result-{i}")).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(entry.len().await, 32);
    }

    #[test]
    fn test_expiry_boundaries() {
        let entry = CacheEntry::new(snapshot(&json!({"v": 1})), Duration::from_secs(60));

        assert!(!entry.is_expired_at(entry.expires_at()));
        assert!(entry.is_expired_at(entry.expires_at() + Duration::from_millis(1)));
        assert!(!entry.is_expired());
    }
}
