//! Graph references, the input contract, and collaborator traits
//!
//! The engine never executes a subgraph itself and never reads graph
//! storage. Both concerns sit behind traits implemented by the host:
//! [`SubgraphRunner`] invokes the subgraph once per item, and
//! [`SubgraphCatalog`] answers the two metadata questions the engine has
//! about a graph reference: which input fields does it declare, and what is
//! its current definition payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Boxed error returned across the collaborator boundary
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A reference to a stored subgraph.
///
/// The engine treats the reference as opaque text; it only requires it to
/// be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphRef(String);

impl GraphRef {
    /// Create a graph reference, rejecting blank identifiers.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EngineError::configuration(
                "graph reference must not be empty",
            ));
        }
        Ok(GraphRef(id))
    }

    /// The underlying identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GraphRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The input contract a valid item must satisfy.
///
/// Derived once per invocation from the subgraph's declared input ports;
/// field order follows the declaration order reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphContract {
    fields: Vec<String>,
}

impl SubgraphContract {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// The declared input field names, in declaration order.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The opaque subgraph callable, invoked once per batch item.
///
/// The engine awaits the invocation but never interrupts it; cancellation
/// is cooperative and applies only to invocations that have not started.
/// Implementations may run nested graphs, perform network calls, or do
/// anything else behind this boundary.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use subflow_core::{BoxError, GraphRef, SubgraphRunner};
///
/// struct Doubler;
///
/// #[async_trait]
/// impl SubgraphRunner for Doubler {
///     async fn invoke(&self, _graph: &GraphRef, input: Value) -> Result<Value, BoxError> {
///         let doubled = input["a"]["value"].as_i64().unwrap_or(0) * 2;
///         Ok(json!({"a": {"type": "scalar", "value": doubled}}))
///     }
/// }
/// ```
#[async_trait]
pub trait SubgraphRunner: Send + Sync {
    /// Run the subgraph against one item's field mapping.
    async fn invoke(&self, graph: &GraphRef, input: Value) -> std::result::Result<Value, BoxError>;
}

/// Metadata provider for stored subgraphs.
///
/// Supplies the declared input field names (from which the engine derives
/// the [`SubgraphContract`]) and the full node-data set (from which it
/// derives the definition snapshot used for cache invalidation).
#[async_trait]
pub trait SubgraphCatalog: Send + Sync {
    /// The subgraph's declared input field names, in declaration order.
    async fn input_fields(
        &self,
        graph: &GraphRef,
    ) -> std::result::Result<Vec<String>, BoxError>;

    /// The subgraph's full definition payload, covering every node's data.
    async fn definition(&self, graph: &GraphRef) -> std::result::Result<Value, BoxError>;
}
