//! Initial logging: a free-form description becomes a complete record.

use serde_json::json;

use crate::compiler::{Instructions, WorkedExample};
use crate::engine::CallSite;
use crate::merge::PolicyTable;
use crate::schema::Schema;

pub const NAME: &str = "log";

pub fn call_site() -> CallSite {
    CallSite {
        name: NAME,
        schema: Schema::interaction(),
        policies: PolicyTable::replace_all(),
        instructions: instructions(),
        require_complete: true,
        empty_on_missing_payload: false,
        clear_on_empty: false,
        temperature: None,
    }
}

fn instructions() -> Instructions {
    Instructions {
        task: "You are a meticulous data extraction agent for a pharmaceutical CRM. Read the \
               representative's description of an interaction with a healthcare professional \
               (HCP) and extract one complete interaction record."
            .into(),
        rules: vec![
            "Work out relative dates (\"yesterday\", \"this morning\") from today's date.".into(),
            "If no date is stated, use today's date. If no time is stated, use 09:00.".into(),
            "If a field is not mentioned, give it an empty string \"\".".into(),
            "List every person present in attendees, including the HCP.".into(),
        ],
        examples: vec![WorkedExample::new(
            "Had a quick call with Dr. Carter this morning. It was a neutral conversation about \
             the side effects of CardioPlus. He's not ready to commit.",
            "- HCP name: Dr. Carter is named.\n\
             - Interaction type: \"quick call\" means Call.\n\
             - Date: \"this morning\" is today, {today}.\n\
             - Time: \"this morning\" gives no exact time, so 09:00.\n\
             - Attendees: only Dr. Carter.\n\
             - Topics: the side effects of CardioPlus.\n\
             - Sentiment: the text says neutral.\n\
             - Outcome: he is not ready to commit.\n\
             - Follow-up actions: none mentioned.",
            json!({
                "hcp_name": "Dr. Carter",
                "interaction_type": "Call",
                "date": "{today}",
                "time": "09:00",
                "attendees": ["Dr. Carter"],
                "topics_discussed": "Side effects of CardioPlus",
                "sentiment": "Neutral",
                "outcomes": "He is not ready to commit.",
                "follow_up_actions": ""
            }),
        )],
    }
}
