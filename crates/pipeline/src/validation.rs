//! Validation gate: checks an extracted payload against a schema before
//! anything is merged.
//!
//! The gate works on its own copy of the payload. A failure never touches a
//! snapshot, so the merge target stays exactly as it was.

use fieldscribe_config::UnknownFieldPolicy;
use fieldscribe_core::interaction::{parse_calendar_date, parse_clock_time};
use fieldscribe_core::{EntitySnapshot, ValidationError};
use serde_json::{Map, Value};
use tracing::warn;

use crate::schema::{FieldKind, FieldSpec, Schema};

/// A payload that passed the gate. Only the gate can build one, and only a
/// `ValidatedUpdate` can be merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedUpdate(Map<String, Value>);

impl ValidatedUpdate {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

pub struct ValidationGate<'a> {
    schema: &'a Schema,
    unknown_fields: UnknownFieldPolicy,
    clearing: bool,
}

impl<'a> ValidationGate<'a> {
    pub fn new(schema: &'a Schema, unknown_fields: UnknownFieldPolicy) -> Self {
        Self {
            schema,
            unknown_fields,
            clearing: false,
        }
    }

    /// Let `null` or `""` clear an optional field. Lists clear to `[]`.
    /// Required fields are never cleared.
    pub fn clearing(mut self, enabled: bool) -> Self {
        self.clearing = enabled;
        self
    }

    /// Check every field of `payload`.
    ///
    /// `null` and empty-string values mean "not mentioned" and are dropped,
    /// unless clearing is enabled and the field is optional.
    /// Accepted values come back normalized (canonical date and time
    /// formats, single strings wrapped into one-element lists).
    pub fn validate(&self, payload: Map<String, Value>) -> Result<ValidatedUpdate, ValidationError> {
        let mut accepted = Map::new();

        for (name, value) in payload {
            let Some(spec) = self.schema.get(&name) else {
                match self.unknown_fields {
                    UnknownFieldPolicy::Drop => {
                        warn!(field = %name, "Dropping field that is not in the schema");
                        continue;
                    }
                    UnknownFieldPolicy::Reject => {
                        return Err(ValidationError::UnknownField { field: name });
                    }
                }
            };

            if is_unmentioned(&value) {
                if self.clearing && !spec.required {
                    let cleared = if spec.kind.is_list() {
                        Value::Array(Vec::new())
                    } else {
                        Value::Null
                    };
                    accepted.insert(name, cleared);
                }
                continue;
            }

            let normalized = check_value(spec, value)?;
            accepted.insert(name, normalized);
        }

        Ok(ValidatedUpdate(accepted))
    }
}

/// Every required field of `schema` holds a value in `snapshot`.
pub fn check_complete(snapshot: &EntitySnapshot, schema: &Schema) -> Result<(), ValidationError> {
    let missing: Vec<String> = schema
        .required_fields()
        .filter(|f| !has_content(snapshot.get(&f.name)))
        .map(|f| f.name.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingRequired { fields: missing })
    }
}

fn has_content(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn is_unmentioned(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_value(spec: &FieldSpec, value: Value) -> Result<Value, ValidationError> {
    let wrong_shape = |found: &Value| ValidationError::WrongShape {
        field: spec.name.clone(),
        expected: spec.kind.describe(),
        found: render(found),
    };

    match &spec.kind {
        FieldKind::Text => match value {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            other => Err(wrong_shape(&other)),
        },
        FieldKind::Date => match value.as_str().and_then(parse_calendar_date) {
            Some(date) => Ok(Value::String(date.format("%Y-%m-%d").to_string())),
            None => Err(wrong_shape(&value)),
        },
        FieldKind::Time => match value.as_str().and_then(parse_clock_time) {
            Some(time) => Ok(Value::String(time.format("%H:%M:%S").to_string())),
            None => Err(wrong_shape(&value)),
        },
        FieldKind::TextList => match value {
            Value::String(s) => Ok(Value::Array(vec![Value::String(s.trim().to_string())])),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) if s.trim().is_empty() => {}
                        Value::String(s) => out.push(Value::String(s.trim().to_string())),
                        other => return Err(wrong_shape(&other)),
                    }
                }
                Ok(Value::Array(out))
            }
            other => Err(wrong_shape(&other)),
        },
        FieldKind::Enumerated(allowed) => match value {
            Value::String(s) if allowed.iter().any(|a| *a == s) => Ok(Value::String(s)),
            other => Err(ValidationError::NotInDomain {
                field: spec.name.clone(),
                value: match other {
                    Value::String(s) => s,
                    v => v.to_string(),
                },
                allowed: allowed.clone(),
            }),
        },
        FieldKind::Records(keys) => match value {
            Value::Array(items) => {
                for item in &items {
                    let ok = item
                        .as_object()
                        .is_some_and(|obj| keys.iter().all(|k| obj.get(k).is_some_and(Value::is_string)));
                    if !ok {
                        return Err(wrong_shape(item));
                    }
                }
                Ok(Value::Array(items))
            }
            other => Err(wrong_shape(&other)),
        },
    }
}

fn render(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 60 {
        format!("{}...", text.chars().take(60).collect::<String>())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gate(schema: &Schema) -> ValidationGate<'_> {
        ValidationGate::new(schema, UnknownFieldPolicy::Drop)
    }

    fn payload(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn out_of_domain_sentiment_is_rejected() {
        let schema = Schema::interaction();
        let err = gate(&schema)
            .validate(payload(json!({"sentiment": "Ecstatic"})))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotInDomain {
                field: "sentiment".into(),
                value: "Ecstatic".into(),
                allowed: vec!["Positive".into(), "Neutral".into(), "Negative".into()],
            }
        );
    }

    #[test]
    fn enum_match_is_case_sensitive() {
        let schema = Schema::interaction();
        assert!(gate(&schema).validate(payload(json!({"interaction_type": "call"}))).is_err());
        assert!(gate(&schema).validate(payload(json!({"interaction_type": "Call"}))).is_ok());
    }

    #[test]
    fn unmentioned_values_are_dropped() {
        let schema = Schema::interaction();
        let update = gate(&schema)
            .validate(payload(json!({"outcomes": "", "date": null, "sentiment": "Neutral"})))
            .unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update.get("sentiment"), Some(&json!("Neutral")));
    }

    #[test]
    fn clearing_gate_turns_empty_values_into_clears() {
        let schema = Schema::interaction();
        let update = gate(&schema)
            .clearing(true)
            .validate(payload(json!({
                "outcomes": "",
                "voice_note_summary": null,
                "samples_distributed": null,
                "sentiment": null
            })))
            .unwrap();
        assert_eq!(update.get("outcomes"), Some(&Value::Null));
        assert_eq!(update.get("voice_note_summary"), Some(&Value::Null));
        assert_eq!(update.get("samples_distributed"), Some(&json!([])));
        // Required fields cannot be cleared.
        assert!(update.get("sentiment").is_none());
        assert_eq!(update.len(), 3);
    }

    #[test]
    fn mixed_payload_fails_as_a_whole() {
        let schema = Schema::interaction();
        let err = gate(&schema)
            .validate(payload(json!({"materials_shared": ["sample kit"], "sentiment": "Thrilled"})))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotInDomain { ref field, .. } if field == "sentiment"));
    }

    #[test]
    fn single_string_wraps_into_list() {
        let schema = Schema::interaction();
        let update = gate(&schema)
            .validate(payload(json!({"attendees": "Dr. Carter", "materials_shared": ["brochure", ""]})))
            .unwrap();
        assert_eq!(update.get("attendees"), Some(&json!(["Dr. Carter"])));
        assert_eq!(update.get("materials_shared"), Some(&json!(["brochure"])));
    }

    #[test]
    fn dates_and_times_are_checked_and_normalized() {
        let schema = Schema::interaction();
        let update = gate(&schema)
            .validate(payload(json!({"date": "2025-08-20", "time": "09:00"})))
            .unwrap();
        assert_eq!(update.get("time"), Some(&json!("09:00:00")));

        let err = gate(&schema)
            .validate(payload(json!({"date": "August 20th"})))
            .unwrap_err();
        assert!(matches!(err, ValidationError::WrongShape { ref field, .. } if field == "date"));
        assert!(gate(&schema).validate(payload(json!({"time": "25:00"}))).is_err());
    }

    #[test]
    fn non_string_text_is_wrong_shape() {
        let schema = Schema::interaction();
        let err = gate(&schema)
            .validate(payload(json!({"topics_discussed": 42})))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongShape {
                field: "topics_discussed".into(),
                expected: "text".into(),
                found: "42".into(),
            }
        );
        assert!(gate(&schema).validate(payload(json!({"attendees": [1, 2]}))).is_err());
    }

    #[test]
    fn unknown_field_policy() {
        let schema = Schema::interaction();
        let update = gate(&schema)
            .validate(payload(json!({"priority": "high", "sentiment": "Positive"})))
            .unwrap();
        assert!(update.get("priority").is_none());
        assert_eq!(update.len(), 1);

        let strict = ValidationGate::new(&schema, UnknownFieldPolicy::Reject);
        assert_eq!(
            strict.validate(payload(json!({"priority": "high"}))).unwrap_err(),
            ValidationError::UnknownField { field: "priority".into() }
        );
    }

    #[test]
    fn record_lists_need_declared_keys() {
        let schema = Schema::suggestions();
        let good = json!({"suggestions": [{"suggestion": "Call back", "rationale": "Open question"}]});
        assert!(gate(&schema).validate(payload(good)).is_ok());

        let bad = json!({"suggestions": [{"suggestion": "Call back"}]});
        assert!(matches!(
            gate(&schema).validate(payload(bad)),
            Err(ValidationError::WrongShape { .. })
        ));
        assert!(gate(&schema).validate(payload(json!({"suggestions": "call"}))).is_err());
    }

    #[test]
    fn completeness_lists_missing_fields() {
        let schema = Schema::summary();
        let snap = EntitySnapshot::new()
            .with_field("relationship_status", json!("Stalling"))
            .with_field("key_takeaways", json!([]));
        assert_eq!(
            check_complete(&snap, &schema).unwrap_err(),
            ValidationError::MissingRequired {
                fields: vec!["key_takeaways".into(), "suggested_focus".into()]
            }
        );

        let snap = snap
            .with_field("key_takeaways", json!(["Interested in data"]))
            .with_field("suggested_focus", json!("Share the trial summary."));
        assert!(check_complete(&snap, &schema).is_ok());
    }
}
