//! History summarization: a short relationship briefing for one HCP.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::compiler::{Instructions, WorkedExample};
use crate::engine::CallSite;
use crate::merge::PolicyTable;
use crate::schema::Schema;

pub const NAME: &str = "summarize";

/// A pre-meeting briefing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub relationship_status: String,
    pub key_takeaways: Vec<String>,
    pub suggested_focus: String,
}

impl Summary {
    /// The fixed briefing for an HCP with no logged interactions.
    pub fn no_history() -> Self {
        Self {
            relationship_status: "New Relationship".into(),
            key_takeaways: vec!["No prior interactions logged.".into()],
            suggested_focus: "Initial engagement and needs assessment.".into(),
        }
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("relationship_status".into(), json!(self.relationship_status));
        map.insert("key_takeaways".into(), json!(self.key_takeaways));
        map.insert("suggested_focus".into(), json!(self.suggested_focus));
        map
    }
}

pub fn call_site() -> CallSite {
    CallSite {
        name: NAME,
        schema: Schema::summary(),
        policies: PolicyTable::replace_all(),
        instructions: instructions(),
        require_complete: true,
        empty_on_missing_payload: false,
        clear_on_empty: false,
        temperature: None,
    }
}

pub fn request_for(hcp_name: &str) -> String {
    format!("Write the briefing for {hcp_name}.")
}

fn instructions() -> Instructions {
    Instructions {
        task: "You are a senior medical science liaison giving a sales representative a \
               pre-meeting briefing. Analyze the interaction history and produce a structured \
               summary."
            .into(),
        rules: vec![
            "Look at the sentiment trend, recurring topics, the last outcome and the overall state of the relationship.".into(),
            "key_takeaways holds two or three short bullet points.".into(),
            "suggested_focus is a single sentence for the next meeting.".into(),
        ],
        examples: vec![WorkedExample::new(
            "Write the briefing for Dr. Rossi.",
            "Sentiment is consistently positive. The recurring topic is OncoBoost efficacy data. \
             The last outcome was a commitment to start patients, a strong buying signal. The \
             relationship is advancing; the next step is enabling the first prescription.",
            json!({
                "relationship_status": "Advancing Positively",
                "key_takeaways": [
                    "Consistently positive sentiment towards OncoBoost.",
                    "High interest in clinical trial data and patient eligibility.",
                    "Recent commitment to prescribe indicates readiness to adopt."
                ],
                "suggested_focus": "Focus the next conversation on patient onboarding and logistical support for a smooth first prescription."
            }),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_history_briefing_round_trips_through_fields() {
        let fields = Summary::no_history().to_fields();
        assert_eq!(fields["relationship_status"], "New Relationship");
        let back: Summary = serde_json::from_value(Value::Object(fields)).unwrap();
        assert_eq!(back, Summary::no_history());
    }
}
