//! Conversational drafting: each chat message adds to or corrects a draft
//! that may still be incomplete.
//!
//! A reply without any JSON is an empty update here, not a failure.

use serde_json::json;

use crate::compiler::{Instructions, WorkedExample};
use crate::engine::CallSite;
use crate::merge::PolicyTable;
use crate::schema::Schema;

pub const NAME: &str = "converse";

pub fn call_site() -> CallSite {
    let schema = Schema::interaction();
    CallSite {
        name: NAME,
        policies: PolicyTable::from_schema(&schema),
        schema,
        instructions: instructions(),
        require_complete: false,
        empty_on_missing_payload: true,
        clear_on_empty: false,
        temperature: None,
    }
}

fn instructions() -> Instructions {
    Instructions {
        task: "You are a precise conversational assistant filling in an interaction form. \
               Compare the user's message with the current data and return a JSON object \
               holding ONLY the fields that need to be added or changed."
            .into(),
        rules: vec![
            "Never repeat fields whose value stays the same.".into(),
            "For list fields, return only the new items. They are appended to the existing list.".into(),
            "Work out relative dates from today's date.".into(),
            "If the message describes a whole new interaction, extract every field it mentions.".into(),
        ],
        examples: vec![
            WorkedExample::new(
                "update the date to August 20th, 2025",
                "The user corrects a single field, 'date'. The new value is 2025-08-20.",
                json!({"date": "2025-08-20"}),
            ),
            WorkedExample::new(
                "Met Dr. Chen today about CardioPlus, it went well.",
                "This describes a new interaction. HCP is Dr. Chen, the topic is CardioPlus, \
                 the sentiment is Positive, the date is today, {today}.",
                json!({
                    "hcp_name": "Dr. Chen",
                    "topics_discussed": "CardioPlus",
                    "sentiment": "Positive",
                    "date": "{today}"
                }),
            ),
            WorkedExample::new(
                "I also left a sample kit",
                "The user adds one item to samples_distributed.",
                json!({"samples_distributed": ["sample kit"]}),
            ),
        ],
    }
}
