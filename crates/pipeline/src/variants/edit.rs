//! Post-hoc editing of a stored record from a natural-language command.
//!
//! The result must still be a complete record; it is written back with the
//! version it was read at. Lists are replaced wholesale so items can be
//! removed, and an explicit `null` clears an optional field.

use serde_json::json;

use crate::compiler::{Instructions, WorkedExample};
use crate::engine::CallSite;
use crate::merge::{MergePolicy, PolicyTable};
use crate::schema::Schema;

pub const NAME: &str = "edit";

pub fn call_site() -> CallSite {
    let schema = Schema::interaction();
    CallSite {
        name: NAME,
        policies: policies(&schema),
        schema,
        instructions: instructions(),
        require_complete: true,
        empty_on_missing_payload: false,
        clear_on_empty: true,
        temperature: None,
    }
}

/// Enums are domain-checked, everything else (lists included) replaces.
fn policies(schema: &Schema) -> PolicyTable {
    schema
        .fields()
        .iter()
        .filter(|f| f.kind.is_list())
        .fold(PolicyTable::from_schema(schema), |table, f| {
            table.with(f.name.clone(), MergePolicy::Replace)
        })
}

fn instructions() -> Instructions {
    Instructions {
        task: "You are a precise data modification agent for a CRM. Compare the user's command \
               with the current interaction data and return a JSON object holding ONLY the \
               fields that must change."
            .into(),
        rules: vec![
            "Do not include fields that remain the same.".into(),
            "For a list field that changes, return the complete new list: keep the items that \
             stay, add new ones, leave out removed ones."
                .into(),
            "To clear an optional field, return null for it.".into(),
            "Work out relative dates (\"tomorrow\", \"the 21st\") from today's date and the current data.".into(),
        ],
        examples: vec![
            WorkedExample::new(
                "Change the sentiment to Neutral and move the meeting to the 21st.",
                "- Two fields change.\n\
                 - sentiment is currently Positive and becomes Neutral.\n\
                 - date is currently 2025-08-19 and becomes 2025-08-21.",
                json!({"sentiment": "Neutral", "date": "2025-08-21"}),
            ),
            WorkedExample::new(
                "I didn't leave the sample kit after all, and drop the outcome.",
                "- materials_shared is currently [\"brochure\", \"sample kit\"]; the sample kit \
                 goes, so the full new list is [\"brochure\"].\n\
                 - outcomes is cleared, so it is null.",
                json!({"materials_shared": ["brochure"], "outcomes": null}),
            ),
        ],
    }
}
