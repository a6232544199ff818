//! # subflow-core - Bounded Subgraph Iteration
//!
//! **Run a subgraph once per batch item** with a fixed concurrency limit,
//! content-addressed result memoization, batch-level input validation, and
//! clean abort-on-first-failure semantics.
//!
//! ## Overview
//!
//! `subflow-core` is the iteration engine of subflow. Given a batch of
//! items and a reference to a stored subgraph, it provides:
//!
//! - **Bounded parallelism** - at most N subgraph invocations in flight,
//!   from fully sequential (N = 1) to fully parallel (N ≥ batch size)
//! - **Ordered results** - output position always matches input position,
//!   whatever the completion order
//! - **Memoization** - results keyed by a fingerprint of `{graph, item}`,
//!   invalidated wholesale when the subgraph definition changes
//! - **Contract validation** - every item checked against the subgraph's
//!   declared input ports, with all problems across the batch reported in
//!   one diagnostic
//! - **Cooperative abort** - one failing item stops not-yet-started work
//!   while in-flight invocations finish naturally
//!
//! ## Core Concepts
//!
//! ### 1. Collaborator Traits
//!
//! The engine never executes or stores subgraphs. Hosts implement two
//! traits: [`SubgraphRunner`] (the opaque async callable invoked per item)
//! and [`SubgraphCatalog`] (declared input fields and the definition
//! payload used for change detection).
//!
//! ### 2. Execution Phases
//!
//! ```text
//! batch ─► Validating ─► Dispatching ─► Awaiting ─► Aggregating ─► results
//!             │              │              │             │
//!          contract       snapshot +     bounded       ordered outputs
//!          violations     cache entry,   executor,     or one batch
//!          reject early   task per item  abort latch   error
//! ```
//!
//! ### 3. Outcome Aggregation
//!
//! Each item produces exactly one [`TaskOutcome`]: `Success`, `Skipped`
//! (abort latched before it started), or `Failed`. Failures never escape
//! individually; the batch either returns every result in order or a
//! single error enumerating each failed index.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use subflow_core::{
//!     BoxError, EngineConfig, GraphRef, IterationEngine, RunOptions, SubgraphCatalog,
//!     SubgraphRunner,
//! };
//!
//! struct Doubler;
//!
//! #[async_trait]
//! impl SubgraphRunner for Doubler {
//!     async fn invoke(&self, _graph: &GraphRef, input: Value) -> Result<Value, BoxError> {
//!         let a = input["a"]["value"].as_i64().unwrap_or(0);
//!         Ok(json!({"a": {"type": "scalar", "value": a * 2}}))
//!     }
//! }
//!
//! struct Ports;
//!
//! #[async_trait]
//! impl SubgraphCatalog for Ports {
//!     async fn input_fields(&self, _graph: &GraphRef) -> Result<Vec<String>, BoxError> {
//!         Ok(vec!["a".to_string()])
//!     }
//!
//!     async fn definition(&self, _graph: &GraphRef) -> Result<Value, BoxError> {
//!         Ok(json!({"nodes": [{"id": "double", "data": {"factor": 2}}]}))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = IterationEngine::new(Arc::new(Doubler), Arc::new(Ports))
//!         .with_config(EngineConfig::new().with_concurrency(2));
//!
//!     let graph = GraphRef::new("sub-1")?;
//!     let batch = vec![
//!         json!({"a": {"type": "scalar", "value": 1}}),
//!         json!({"a": {"type": "scalar", "value": 2}}),
//!         json!({"a": {"type": "scalar", "value": 3}}),
//!     ];
//!
//!     let results = engine.run(&graph, &batch, RunOptions::new()).await?;
//!     assert_eq!(results[2], json!({"a": {"type": "scalar", "value": 6}}));
//!     Ok(())
//! }
//! ```
//!
//! ## Caching
//!
//! Memoization is off by default; enable it per engine or per invocation.
//! Results are stored compressed in a [`ResultCache`] scoped by the
//! engine's **instance key** (the identity of the engine node, not of the
//! subgraph), expire an hour after entry creation, and are dropped as soon
//! as the subgraph definition changes.
//!
//! ## See Also
//!
//! - `subflow-cache` - fingerprinting, codec, and the result store

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod graph;
pub mod item;
pub mod validate;

pub use cancel::AbortSignal;
pub use config::{EngineConfig, ResolvedRun, RunOptions};
pub use engine::IterationEngine;
pub use error::{EngineError, Result};
pub use executor::{BoundedExecutor, TaskFuture, TaskOutcome};
pub use graph::{BoxError, GraphRef, SubgraphCatalog, SubgraphContract, SubgraphRunner};
pub use item::{Item, TaggedValue};
pub use validate::{validate_batch, validate_item, ItemIssues};

pub use subflow_cache::{CacheConfig, CacheEntry, DefinitionSnapshot, ObjectCodec, ResultCache};
