//! Batch validation against the subgraph input contract
//!
//! Validation runs before any task is dispatched and accumulates the union
//! of problems across the whole batch, so a caller fixing their input sees
//! every missing field and every malformed value at once instead of
//! replaying the batch one error at a time.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::graph::SubgraphContract;
use crate::item::{Item, TaggedValue};

/// Problems found in a single item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemIssues {
    /// Contract fields the item does not carry
    pub missing: BTreeSet<String>,
    /// Present fields whose values fail the tagged-value predicate
    pub invalid: BTreeSet<String>,
}

impl ItemIssues {
    /// Whether the item satisfied the contract.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }
}

/// Check one item against the contract. Never mutates the item.
///
/// Every contract field absent from the item is recorded as missing; every
/// present field whose value is not a `scalar`, `array`, or `function`
/// tagged value is recorded as invalid. The two checks are independent: an
/// item can be both incomplete and malformed.
pub fn validate_item(item: &Item, contract: &SubgraphContract) -> ItemIssues {
    let mut issues = ItemIssues::default();

    for field in contract.field_names() {
        if !item.has_field(field) {
            issues.missing.insert(field.clone());
        }
    }

    for (name, value) in item.fields() {
        if !TaggedValue::is_field_value(value) {
            issues.invalid.insert(name.clone());
        }
    }

    issues
}

/// Check the whole batch, accumulating every problem before reporting.
///
/// Returns a single [`EngineError::Validation`] whose message enumerates
/// each missing field and each offending value by item index.
pub fn validate_batch(items: &[Item], contract: &SubgraphContract) -> Result<()> {
    let mut problems = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let issues = validate_item(item, contract);
        for field in &issues.missing {
            problems.push(format!("item {index} is missing required field `{field}`"));
        }
        for field in &issues.invalid {
            let value = item.get(field).cloned().unwrap_or(Value::Null);
            problems.push(format!(
                "item {index} field `{field}` is not a tagged value: {value}"
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(EngineError::validation(problems.join("; ")))
    }
}
