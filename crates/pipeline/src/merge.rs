//! Field merge engine: applies a validated update to a snapshot.
//!
//! Copy-then-merge: the input snapshot is never modified. List-policy fields
//! are applied first and taken out of the update; every remaining field then
//! replaces the existing value.

use fieldscribe_core::EntitySnapshot;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{FieldKind, Schema};
use crate::validation::ValidatedUpdate;

/// How one field combines with its existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Overwrite.
    Replace,
    /// Append items not already present, keeping existing order.
    AppendUnique,
    /// Overwrite; the domain check already happened at the gate.
    ValidateEnumThenReplace,
}

/// Per-field merge policies. Fields without an entry are replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTable {
    policies: HashMap<String, MergePolicy>,
}

impl PolicyTable {
    /// Every field replaces.
    pub fn replace_all() -> Self {
        Self::default()
    }

    /// Lists append, enums are domain-checked then replaced, the rest replace.
    pub fn from_schema(schema: &Schema) -> Self {
        let policies = schema
            .fields()
            .iter()
            .map(|f| {
                let policy = match f.kind {
                    FieldKind::TextList => MergePolicy::AppendUnique,
                    FieldKind::Enumerated(_) => MergePolicy::ValidateEnumThenReplace,
                    _ => MergePolicy::Replace,
                };
                (f.name.clone(), policy)
            })
            .collect();
        Self { policies }
    }

    pub fn with(mut self, field: impl Into<String>, policy: MergePolicy) -> Self {
        self.policies.insert(field.into(), policy);
        self
    }

    pub fn policy_for(&self, field: &str) -> MergePolicy {
        self.policies.get(field).copied().unwrap_or(MergePolicy::Replace)
    }
}

/// Apply `update` to a copy of `snapshot`.
pub fn merge(snapshot: &EntitySnapshot, update: ValidatedUpdate, policies: &PolicyTable) -> EntitySnapshot {
    let mut merged = snapshot.clone();
    let mut remaining = update.into_fields();

    let list_fields: Vec<String> = remaining
        .keys()
        .filter(|k| policies.policy_for(k) == MergePolicy::AppendUnique)
        .cloned()
        .collect();

    for field in list_fields {
        let Some(incoming) = remaining.remove(&field) else {
            continue;
        };
        let mut items = match merged.fields.remove(&field) {
            Some(Value::Array(existing)) => existing,
            _ => Vec::new(),
        };
        let additions = match incoming {
            Value::Array(new_items) => new_items,
            other => vec![other],
        };
        for item in additions {
            if !items.contains(&item) {
                items.push(item);
            }
        }
        merged.fields.insert(field, Value::Array(items));
    }

    for (field, value) in remaining {
        merged.fields.insert(field, value);
    }

    merged
}
