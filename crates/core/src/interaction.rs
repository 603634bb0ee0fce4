//! Interaction record: the domain entity every pipeline call site targets.
//!
//! One record describes a single interaction between a representative and a
//! healthcare professional (HCP). Enumerated fields have fixed domains that
//! are matched case-sensitively.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::snapshot::EntitySnapshot;

/// How the interaction took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionType {
    Meeting,
    Call,
    Virtual,
}

impl InteractionType {
    /// Allowed literals, in display order.
    pub const VALUES: &'static [&'static str] = &["Meeting", "Call", "Virtual"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "Meeting",
            Self::Call => "Call",
            Self::Virtual => "Virtual",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall tone of the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Allowed literals, in display order.
    pub const VALUES: &'static [&'static str] = &["Positive", "Neutral", "Negative"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user-editable fields of an interaction.
///
/// This is also the payload for creating a record: the store assigns
/// `id`, timestamps and `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionFields {
    pub hcp_name: String,

    pub interaction_type: InteractionType,

    pub date: NaiveDate,

    #[serde(with = "clock_time")]
    pub time: NaiveTime,

    #[serde(default)]
    pub attendees: Vec<String>,

    pub topics_discussed: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_note_summary: Option<String>,

    #[serde(default)]
    pub materials_shared: Vec<String>,

    #[serde(default)]
    pub samples_distributed: Vec<String>,

    pub sentiment: Sentiment,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<String>,

    #[serde(default)]
    pub follow_up_actions: Vec<String>,

    #[serde(default)]
    pub ai_suggested_followups: Vec<String>,
}

impl InteractionFields {
    /// Render as a field map (the shape pipelines operate on).
    pub fn to_field_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct of plain fields always serializes to an object.
            _ => Map::new(),
        }
    }

    /// Rebuild typed fields from a field map.
    ///
    /// Keys that are not interaction fields are ignored.
    pub fn from_field_map(fields: &Map<String, Value>) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))
    }

    /// A snapshot of these fields with no version token (not yet stored).
    pub fn to_snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::from_fields(self.to_field_map())
    }
}

/// A stored interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: i64,

    #[serde(flatten)]
    pub fields: InteractionFields,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency token, starts at 1 and grows by one per update.
    pub version: u64,
}

impl InteractionRecord {
    /// The current state of this record as a versioned snapshot.
    pub fn snapshot(&self) -> EntitySnapshot {
        self.fields.to_snapshot().with_version(self.version)
    }

    /// Overlay `changes` on this record's fields and re-check the result.
    pub fn overlay(&self, changes: &Map<String, Value>) -> Result<InteractionFields, StoreError> {
        let mut merged = self.fields.to_field_map();
        for (key, value) in changes {
            merged.insert(key.clone(), value.clone());
        }
        InteractionFields::from_field_map(&merged)
    }
}

/// Parse a calendar date (`YYYY-MM-DD`).
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse a wall-clock time (`HH:MM` or `HH:MM:SS`).
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Serde adapter for times written as `HH:MM` or `HH:MM:SS`.
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_clock_time(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{raw}'")))
    }
}
