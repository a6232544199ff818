//! Batch items and the tagged value model
//!
//! A batch is an array of items; an item is an unordered mapping from port
//! names to tagged values. Port values carry an explicit `type` tag telling
//! the subgraph how to interpret the payload:
//!
//! ```json
//! {"a": {"type": "scalar", "value": 1}, "xs": {"type": "array", "value": [1, 2]}}
//! ```
//!
//! Items arrive in one of two shapes. A bare field mapping is used as-is; an
//! `object`-tagged wrapper is unwrapped to its inner mapping first:
//!
//! ```json
//! {"type": "object", "value": {"a": {"type": "scalar", "value": 1}}}
//! ```
//!
//! Anything that is not a JSON object rejects the whole batch before
//! per-field validation runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

/// A discriminated port value with an explicit kind tag.
///
/// The set of tags is closed: every value a port can carry is one of these
/// four shapes, matched exhaustively. Individual item fields accept only the
/// `scalar`, `array`, and `function` tags; the `object` tag wraps a whole
/// item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaggedValue {
    /// A single primitive payload
    Scalar { value: Value },
    /// An ordered list payload
    Array { value: Vec<Value> },
    /// An opaque callable reference, passed through untouched
    Function { value: Value },
    /// A field mapping, used to wrap whole items
    Object { value: Map<String, Value> },
}

impl TaggedValue {
    /// The tag string of this value.
    pub fn kind(&self) -> &'static str {
        match self {
            TaggedValue::Scalar { .. } => "scalar",
            TaggedValue::Array { .. } => "array",
            TaggedValue::Function { .. } => "function",
            TaggedValue::Object { .. } => "object",
        }
    }

    /// Whether a raw JSON value is acceptable as an item field.
    ///
    /// True exactly when the value parses as a tagged value whose tag is
    /// `scalar`, `array`, or `function`.
    pub fn is_field_value(raw: &Value) -> bool {
        match serde_json::from_value::<TaggedValue>(raw.clone()) {
            Ok(TaggedValue::Scalar { .. })
            | Ok(TaggedValue::Array { .. })
            | Ok(TaggedValue::Function { .. }) => true,
            Ok(TaggedValue::Object { .. }) | Err(_) => false,
        }
    }
}

/// One element of the input batch, normalized to its field mapping.
///
/// Serializes as the bare mapping, so fingerprinting an item sees exactly
/// the fields the subgraph will receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item(Map<String, Value>);

impl Item {
    /// Normalize one raw batch element.
    ///
    /// Unwraps an `object`-tagged wrapper to its inner mapping; any other
    /// JSON object is taken as the mapping itself. Non-object shapes are
    /// rejected.
    pub fn from_value(raw: &Value) -> Result<Self> {
        Self::normalize(raw).map_err(EngineError::validation)
    }

    /// Normalize a whole batch, rejecting it on the first malformed element.
    pub fn parse_batch(batch: &[Value]) -> Result<Vec<Self>> {
        batch
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                Self::normalize(raw)
                    .map_err(|msg| EngineError::validation(format!("item {index}: {msg}")))
            })
            .collect()
    }

    fn normalize(raw: &Value) -> std::result::Result<Self, String> {
        match raw {
            Value::Object(map) => match (map.get("type"), map.get("value")) {
                (Some(Value::String(tag)), Some(Value::Object(inner))) if tag == "object" => {
                    Ok(Item(inner.clone()))
                }
                _ => Ok(Item(map.clone())),
            },
            other => Err(format!("item must be an object, got {}", type_name(other))),
        }
    }

    /// The normalized field mapping.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up one field's raw value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether the item carries a field of this name.
    pub fn has_field(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// The item as the JSON object handed to the subgraph callable.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Item {
    fn from(fields: Map<String, Value>) -> Self {
        Item(fields)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
