//! Batch orchestration: validate, dispatch, await, aggregate
//!
//! [`IterationEngine`] ties the crate together. One call to
//! [`IterationEngine::run`] moves through four phases:
//!
//! ```text
//! Validating ──► Dispatching ──► Awaiting ──► Aggregating
//!     │               │              │             │
//!     │ contract      │ snapshot +   │ bounded     │ commit cache,
//!     │ violations    │ one task     │ pool, abort │ concatenate
//!     ▼               │ per item     │ latch       ▼ failures
//!  batch error        ▼              ▼          batch result / error
//! ```
//!
//! Validation failures exit before any task is dispatched. After dispatch,
//! per-item failures are recovered into outcomes, trip the shared abort
//! latch, and surface only in the aggregated batch error.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use uuid::Uuid;

use subflow_cache::{fingerprint, CacheEntry, DefinitionSnapshot, ObjectCodec, ResultCache};

use crate::cancel::AbortSignal;
use crate::config::{EngineConfig, RunOptions};
use crate::error::{EngineError, Result};
use crate::executor::{BoundedExecutor, TaskFuture, TaskOutcome};
use crate::graph::{GraphRef, SubgraphCatalog, SubgraphContract, SubgraphRunner};
use crate::item::Item;
use crate::validate::validate_batch;

/// Runs a subgraph once per batch item with bounded concurrency and
/// content-addressed memoization.
///
/// The engine owns no subgraph logic itself: invocation goes through the
/// injected [`SubgraphRunner`], metadata through the injected
/// [`SubgraphCatalog`]. Cached results live in a [`ResultCache`] scoped by
/// this engine's instance key; pass a shared store to let several engines
/// coexist, or keep the default private one.
///
/// Construction is builder-style:
///
/// ```ignore
/// let engine = IterationEngine::new(runner, catalog)
///     .with_instance_key("loop-node-17")
///     .with_result_cache(shared_store)
///     .with_config(EngineConfig::new().with_concurrency(4).with_caching(true));
/// ```
pub struct IterationEngine {
    runner: Arc<dyn SubgraphRunner>,
    catalog: Arc<dyn SubgraphCatalog>,
    cache: ResultCache,
    codec: ObjectCodec,
    config: EngineConfig,
    instance_key: String,
}

impl std::fmt::Debug for IterationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationEngine")
            .field("runner", &"<subgraph runner>")
            .field("catalog", &"<subgraph catalog>")
            .field("config", &self.config)
            .field("instance_key", &self.instance_key)
            .finish()
    }
}

impl IterationEngine {
    /// Create an engine with default configuration, a private result store,
    /// and a random instance key.
    pub fn new(runner: Arc<dyn SubgraphRunner>, catalog: Arc<dyn SubgraphCatalog>) -> Self {
        Self {
            runner,
            catalog,
            cache: ResultCache::new(),
            codec: ObjectCodec::new(),
            config: EngineConfig::default(),
            instance_key: Uuid::new_v4().to_string(),
        }
    }

    /// Replace the engine-level defaults.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a stable instance key so cached results survive engine rebuilds.
    ///
    /// The key identifies the engine node instance, not the subgraph: two
    /// engines iterating the same subgraph under different keys keep
    /// independent cache entries.
    pub fn with_instance_key(mut self, key: impl Into<String>) -> Self {
        self.instance_key = key.into();
        self
    }

    /// Share a process-wide result store with other engine instances.
    pub fn with_result_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    /// This engine's cache scope.
    pub fn instance_key(&self) -> &str {
        &self.instance_key
    }

    /// The engine-level defaults.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the subgraph once per batch element.
    ///
    /// On success the returned vector holds one result per input item, in
    /// input order. Any contract violation rejects the whole batch before
    /// dispatch ([`EngineError::Validation`]); any item failure aborts
    /// outstanding work and surfaces as one aggregated
    /// [`EngineError::Batch`] naming each failed index. No partial result
    /// list is ever returned.
    pub async fn run(
        &self,
        graph: &GraphRef,
        batch: &[Value],
        options: RunOptions,
    ) -> Result<Vec<Value>> {
        let resolved = self.config.resolve(&options);
        let signal = options.signal.unwrap_or_default();

        tracing::debug!(
            graph = %graph,
            items = batch.len(),
            concurrency = resolved.concurrency,
            caching = resolved.caching,
            "Starting batch run"
        );

        // Validating
        let items = Item::parse_batch(batch)?;
        let contract = self.contract_for(graph).await?;
        validate_batch(&items, &contract)?;

        // Dispatching
        let entry = if resolved.caching {
            Some(self.checked_out_entry(graph).await?)
        } else {
            None
        };

        let tasks: Vec<TaskFuture> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                self.build_task(index, item, graph.clone(), entry.clone(), signal.clone())
            })
            .collect();

        // Awaiting
        let outcomes = BoundedExecutor::new(resolved.concurrency)
            .run(tasks, &signal)
            .await;

        // Aggregating
        let fully_successful = outcomes.iter().all(TaskOutcome::is_success);
        if let Some(entry) = entry {
            self.cache.commit(&self.instance_key, entry).await;
            if fully_successful {
                self.cache.sweep_expired(Instant::now()).await;
            }
        }

        aggregate(outcomes)
    }

    /// Derive the input contract from the subgraph's declared input ports.
    async fn contract_for(&self, graph: &GraphRef) -> Result<SubgraphContract> {
        let fields = self.catalog.input_fields(graph).await.map_err(|e| {
            EngineError::configuration(format!("cannot read input fields of '{graph}': {e}"))
        })?;
        Ok(SubgraphContract::new(fields))
    }

    /// Snapshot the subgraph definition and check the cache entry out of
    /// the store, invalidating it if the definition changed.
    async fn checked_out_entry(&self, graph: &GraphRef) -> Result<CacheEntry> {
        let definition = self.catalog.definition(graph).await.map_err(|e| {
            EngineError::configuration(format!("cannot read definition of '{graph}': {e}"))
        })?;
        let snapshot = DefinitionSnapshot::of(&definition)?;

        let mut entry = self.cache.get_or_create(&self.instance_key, &snapshot).await;
        if entry.reconcile(&snapshot).await {
            tracing::info!(
                instance_key = %self.instance_key,
                graph = %graph,
                "Subgraph definition changed, cached results invalidated"
            );
        }
        Ok(entry)
    }

    /// Build the task for one item.
    ///
    /// The task consults the cache entry (when caching is on), invokes the
    /// subgraph on a miss, stores the fresh result, and recovers every
    /// failure into an outcome. Codec trouble never costs a computed
    /// result: encode failures skip caching, decode failures recompute.
    fn build_task(
        &self,
        index: usize,
        item: Item,
        graph: GraphRef,
        entry: Option<CacheEntry>,
        signal: AbortSignal,
    ) -> TaskFuture {
        let runner = Arc::clone(&self.runner);
        let codec = self.codec.clone();

        Box::pin(async move {
            if signal.is_aborted() {
                return TaskOutcome::Skipped;
            }

            let cache_key = match &entry {
                Some(entry) => {
                    match fingerprint(&json!({"graph": graph.as_str(), "item": &item})) {
                        Ok(key) => {
                            if let Some(hit) = entry.lookup(&key).await {
                                match codec.decode(&hit) {
                                    Ok(value) => {
                                        tracing::debug!(index, "Cache hit");
                                        return TaskOutcome::Success(value);
                                    }
                                    Err(e) => {
                                        tracing::warn!(
                                            index,
                                            error = %e,
                                            "Cached result unreadable, recomputing"
                                        );
                                    }
                                }
                            }
                            Some(key)
                        }
                        Err(e) => {
                            tracing::warn!(
                                index,
                                error = %e,
                                "Fingerprinting failed, result will not be cached"
                            );
                            None
                        }
                    }
                }
                None => None,
            };

            match runner.invoke(&graph, item.to_value()).await {
                Ok(result) => {
                    if let (Some(entry), Some(key)) = (&entry, cache_key) {
                        match codec.encode(&result) {
                            Ok(compressed) => entry.insert(key, compressed).await,
                            Err(e) => {
                                tracing::warn!(
                                    index,
                                    error = %e,
                                    "Result could not be encoded, skipping cache"
                                );
                            }
                        }
                    }
                    TaskOutcome::Success(result)
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Item failed, aborting batch");
                    signal.abort();
                    TaskOutcome::Failed {
                        index,
                        item: item.to_value(),
                        message: e.to_string(),
                    }
                }
            }
        })
    }
}

/// Collapse ordered outcomes into the batch result.
fn aggregate(outcomes: Vec<TaskOutcome>) -> Result<Vec<Value>> {
    let total = outcomes.len();
    let mut results = Vec::with_capacity(total);
    let mut failures = Vec::new();
    let mut skipped = 0usize;

    for outcome in outcomes {
        match outcome {
            TaskOutcome::Success(value) => results.push(value),
            TaskOutcome::Skipped => skipped += 1,
            TaskOutcome::Failed { index, message, .. } => {
                failures.push(format!("item {index} failed: {message}"));
            }
        }
    }

    if failures.is_empty() && skipped == 0 {
        tracing::debug!(results = results.len(), "Batch completed");
        return Ok(results);
    }

    // Skipped items mark the batch as failed without contributing text of
    // their own; an externally aborted batch still needs some message.
    let message = if failures.is_empty() {
        format!("aborted before completion, {skipped} of {total} items skipped")
    } else {
        failures.join("; ")
    };
    tracing::warn!(failed = failures.len(), skipped, "Batch failed");
    Err(EngineError::batch(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::graph::BoxError;

    /// Doubles the scalar payload of every field.
    struct Doubler {
        invocations: Arc<AtomicUsize>,
        fail_on: Option<usize>,
        delay: Duration,
    }

    impl Doubler {
        fn new() -> Self {
            Self {
                invocations: Arc::new(AtomicUsize::new(0)),
                fail_on: None,
                delay: Duration::ZERO,
            }
        }

        fn failing_on(value: usize) -> Self {
            Self {
                fail_on: Some(value),
                ..Self::new()
            }
        }

        fn count(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.invocations)
        }
    }

    #[async_trait]
    impl SubgraphRunner for Doubler {
        async fn invoke(
            &self,
            _graph: &GraphRef,
            input: Value,
        ) -> std::result::Result<Value, BoxError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let a = input["a"]["value"].as_i64().unwrap_or(0);
            if self.fail_on == Some(a as usize) {
                return Err(format!("cannot process value {a}").into());
            }
            Ok(json!({"a": {"type": "scalar", "value": a * 2}}))
        }
    }

    /// Static metadata: one input field "a", definition payload versioned.
    struct Catalog {
        version: Arc<AtomicUsize>,
    }

    impl Catalog {
        fn new() -> Self {
            Self {
                version: Arc::new(AtomicUsize::new(1)),
            }
        }

        fn bump(&self) {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SubgraphCatalog for Catalog {
        async fn input_fields(
            &self,
            _graph: &GraphRef,
        ) -> std::result::Result<Vec<String>, BoxError> {
            Ok(vec!["a".to_string()])
        }

        async fn definition(&self, _graph: &GraphRef) -> std::result::Result<Value, BoxError> {
            Ok(json!({"nodes": [{"id": "double", "data": {"version": self.version.load(Ordering::SeqCst)}}]}))
        }
    }

    struct FailingCatalog;

    #[async_trait]
    impl SubgraphCatalog for FailingCatalog {
        async fn input_fields(
            &self,
            _graph: &GraphRef,
        ) -> std::result::Result<Vec<String>, BoxError> {
            Err("storage offline".into())
        }

        async fn definition(&self, _graph: &GraphRef) -> std::result::Result<Value, BoxError> {
            Err("storage offline".into())
        }
    }

    fn scalar_batch(values: &[i64]) -> Vec<Value> {
        values
            .iter()
            .map(|v| json!({"a": {"type": "scalar", "value": v}}))
            .collect()
    }

    fn graph() -> GraphRef {
        GraphRef::new("sub-1").unwrap()
    }

    #[tokio::test]
    async fn test_doubles_batch_in_order() {
        let engine = IterationEngine::new(Arc::new(Doubler::new()), Arc::new(Catalog::new()));

        let results = engine
            .run(&graph(), &scalar_batch(&[1, 2, 3]), RunOptions::new().with_concurrency(2))
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                json!({"a": {"type": "scalar", "value": 2}}),
                json!({"a": {"type": "scalar", "value": 4}}),
                json!({"a": {"type": "scalar", "value": 6}}),
            ]
        );
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_invocation() {
        let runner = Doubler::new();
        let count = runner.count();
        let engine = IterationEngine::new(Arc::new(runner), Arc::new(Catalog::new()));

        let batch = vec![json!({"b": {"type": "scalar", "value": 1}})];
        let err = engine.run(&graph(), &batch, RunOptions::new()).await.unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("`a`"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_batch_shape_rejects_whole_batch() {
        let engine = IterationEngine::new(Arc::new(Doubler::new()), Arc::new(Catalog::new()));

        let batch = vec![json!({"a": {"type": "scalar", "value": 1}}), json!(42)];
        let err = engine.run(&graph(), &batch, RunOptions::new()).await.unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("item 1"));
    }

    #[tokio::test]
    async fn test_failure_aggregates_and_aborts() {
        let engine = IterationEngine::new(
            Arc::new(Doubler::failing_on(2)),
            Arc::new(Catalog::new()),
        );

        let err = engine
            .run(&graph(), &scalar_batch(&[1, 2, 3]), RunOptions::new())
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, EngineError::Batch(_)));
        assert!(message.contains("item 1 failed"));
        assert!(message.contains("cannot process value 2"));
    }

    #[tokio::test]
    async fn test_sequential_failure_skips_the_rest() {
        let runner = Doubler::failing_on(1);
        let count = runner.count();
        let engine = IterationEngine::new(Arc::new(runner), Arc::new(Catalog::new()));

        let err = engine
            .run(&graph(), &scalar_batch(&[1, 2, 3]), RunOptions::new())
            .await
            .unwrap_err();

        // Item 0 fails at concurrency 1, so items 1 and 2 never start.
        assert!(matches!(err, EngineError::Batch(_)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_caching_skips_second_run() {
        let runner = Doubler::new();
        let count = runner.count();
        let engine = IterationEngine::new(Arc::new(runner), Arc::new(Catalog::new()))
            .with_instance_key("loop-1")
            .with_config(EngineConfig::new().with_caching(true));

        let batch = scalar_batch(&[1, 2, 3]);
        let first = engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);

        let second = engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(count.load(Ordering::SeqCst), 3, "second run must be all hits");
    }

    #[tokio::test]
    async fn test_definition_change_invalidates_cache() {
        let runner = Doubler::new();
        let count = runner.count();
        let catalog = Arc::new(Catalog::new());
        let engine = IterationEngine::new(Arc::new(runner), catalog.clone())
            .with_instance_key("loop-1")
            .with_config(EngineConfig::new().with_caching(true));

        let batch = scalar_batch(&[1]);
        engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Same definition: hit.
        engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Changed definition: the entry is cleared before lookup.
        catalog.bump();
        engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_override_per_invocation() {
        let runner = Doubler::new();
        let count = runner.count();
        let engine = IterationEngine::new(Arc::new(runner), Arc::new(Catalog::new()))
            .with_instance_key("loop-1");

        let batch = scalar_batch(&[5]);
        let options = || RunOptions::new().with_caching(true);

        engine.run(&graph(), &batch, options()).await.unwrap();
        engine.run(&graph(), &batch, options()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Caching off by default: a plain run recomputes.
        engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupt_cached_value_is_recomputed() {
        let store = ResultCache::new();
        let runner = Doubler::new();
        let count = runner.count();
        let catalog = Arc::new(Catalog::new());
        let engine = IterationEngine::new(Arc::new(runner), catalog.clone())
            .with_instance_key("loop-1")
            .with_result_cache(store.clone())
            .with_config(EngineConfig::new().with_caching(true));

        let batch = scalar_batch(&[4]);
        engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Corrupt the stored value in place; the entry survives reconcile
        // because the definition is unchanged.
        let definition = catalog.definition(&graph()).await.unwrap();
        let snapshot = DefinitionSnapshot::of(&definition).unwrap();
        let entry = store.get_or_create("loop-1", &snapshot).await;
        let key = fingerprint(&json!({
            "graph": "sub-1",
            "item": Item::from_value(&batch[0]).unwrap(),
        }))
        .unwrap();
        entry.insert(key, "definitely not gzip".to_string()).await;
        store.commit("loop-1", entry).await;

        let results = engine.run(&graph(), &batch, RunOptions::new()).await.unwrap();
        assert_eq!(results[0]["a"]["value"], json!(8));
        assert_eq!(count.load(Ordering::SeqCst), 2, "corrupt hit must recompute");
    }

    #[tokio::test]
    async fn test_external_signal_skips_batch() {
        let runner = Doubler::new();
        let count = runner.count();
        let engine = IterationEngine::new(Arc::new(runner), Arc::new(Catalog::new()));

        let signal = AbortSignal::new();
        signal.abort();

        let err = engine
            .run(
                &graph(),
                &scalar_batch(&[1, 2]),
                RunOptions::new().with_signal(signal),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Batch(_)));
        assert!(err.to_string().contains("skipped"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_a_configuration_error() {
        let engine = IterationEngine::new(Arc::new(Doubler::new()), Arc::new(FailingCatalog));

        let err = engine
            .run(&graph(), &scalar_batch(&[1]), RunOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Configuration(_)));
        assert!(err.to_string().contains("storage offline"));
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds_empty() {
        let engine = IterationEngine::new(Arc::new(Doubler::new()), Arc::new(Catalog::new()));
        let results = engine.run(&graph(), &[], RunOptions::new()).await.unwrap();
        assert!(results.is_empty());
    }
}
