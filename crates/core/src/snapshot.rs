//! Entity snapshots: the field-map view of a record that pipelines read and
//! rewrite.
//!
//! Snapshots are plain values. A pipeline receives one, and returns a new one;
//! it never holds a reference into caller state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The currently known structured state of one interaction record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Field name → value.
    pub fields: Map<String, Value>,

    /// Version of the stored record this snapshot was read from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl EntitySnapshot {
    /// An empty, unversioned snapshot (a blank form).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            version: None,
        }
    }

    /// Attach the version token of the stored record.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether `field` holds a meaningful value (not null, not an empty string).
    pub fn has_value(&self, field: &str) -> bool {
        match self.fields.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_and_lookup() {
        let snap = EntitySnapshot::new()
            .with_field("sentiment", json!("Positive"))
            .with_field("outcomes", json!(""))
            .with_version(2);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.version, Some(2));
        assert!(snap.has_value("sentiment"));
        assert!(!snap.has_value("outcomes"));
        assert!(!snap.has_value("date"));
    }

    #[test]
    fn unversioned_snapshot_omits_version() {
        let snap = EntitySnapshot::new().with_field("date", json!("2025-08-20"));
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("version"));
    }
}
