//! Field schemas: names, kinds and enumerated domains of the objects a
//! pipeline asks the model for.

use fieldscribe_core::{InteractionType, Sentiment};

/// The shape a field value must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Wall-clock time, `HH:MM` or `HH:MM:SS`.
    Time,
    /// List of short strings.
    TextList,
    /// One of a fixed set of literals, matched exactly.
    Enumerated(Vec<String>),
    /// List of objects, each holding the given string keys.
    Records(Vec<String>),
}

impl FieldKind {
    pub fn enumerated(values: &[&str]) -> Self {
        Self::Enumerated(values.iter().map(|v| v.to_string()).collect())
    }

    pub fn records(keys: &[&str]) -> Self {
        Self::Records(keys.iter().map(|k| k.to_string()).collect())
    }

    /// Human-readable type description used in instructions and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Text => "text".into(),
            Self::Date => "date (YYYY-MM-DD)".into(),
            Self::Time => "time (HH:MM)".into(),
            Self::TextList => "list of strings".into(),
            Self::Enumerated(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
                format!("one of {}", quoted.join(", "))
            }
            Self::Records(keys) => {
                let shape: Vec<String> = keys.iter().map(|k| format!("\"{k}\": text")).collect();
                format!("list of objects {{{}}}", shape.join(", "))
            }
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::TextList | Self::Records(_))
    }
}

/// One field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub description: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// An ordered set of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// The schema interaction records are extracted into.
    pub fn interaction() -> Self {
        Self::new(vec![
            FieldSpec::new("hcp_name", FieldKind::Text, "Name of the healthcare professional").required(),
            FieldSpec::new(
                "interaction_type",
                FieldKind::enumerated(InteractionType::VALUES),
                "How the interaction took place",
            )
            .required(),
            FieldSpec::new("date", FieldKind::Date, "Day of the interaction").required(),
            FieldSpec::new("time", FieldKind::Time, "Time of the interaction").required(),
            FieldSpec::new("attendees", FieldKind::TextList, "People present"),
            FieldSpec::new("topics_discussed", FieldKind::Text, "What was discussed").required(),
            FieldSpec::new("voice_note_summary", FieldKind::Text, "Summary of any voice note"),
            FieldSpec::new("materials_shared", FieldKind::TextList, "Brochures, studies or other materials handed over"),
            FieldSpec::new("samples_distributed", FieldKind::TextList, "Product samples left with the HCP"),
            FieldSpec::new(
                "sentiment",
                FieldKind::enumerated(Sentiment::VALUES),
                "Overall tone of the interaction",
            )
            .required(),
            FieldSpec::new("outcomes", FieldKind::Text, "What came out of the interaction"),
            FieldSpec::new("follow_up_actions", FieldKind::TextList, "Agreed next steps"),
            FieldSpec::new("ai_suggested_followups", FieldKind::TextList, "Follow-ups proposed by the assistant"),
        ])
    }

    /// The schema of a relationship briefing.
    pub fn summary() -> Self {
        Self::new(vec![
            FieldSpec::new(
                "relationship_status",
                FieldKind::Text,
                "Short label for the state of the relationship",
            )
            .required(),
            FieldSpec::new("key_takeaways", FieldKind::TextList, "Two or three key observations").required(),
            FieldSpec::new("suggested_focus", FieldKind::Text, "One sentence on what the next meeting should focus on")
                .required(),
        ])
    }

    /// The schema of a ranked next-action list.
    pub fn suggestions() -> Self {
        Self::new(vec![
            FieldSpec::new(
                "suggestions",
                FieldKind::records(&["suggestion", "rationale"]),
                "Three concrete next actions, most important first, each with a rationale",
            )
            .required(),
        ])
    }
}
