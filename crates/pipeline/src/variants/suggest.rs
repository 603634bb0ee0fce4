//! Next-action suggestions: three ranked, reasoned steps for one HCP.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::compiler::{Instructions, WorkedExample};
use crate::engine::CallSite;
use crate::merge::PolicyTable;
use crate::schema::Schema;

pub const NAME: &str = "suggest";

/// One suggested step, with the reason it matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    #[serde(rename = "suggestion")]
    pub action: String,
    pub rationale: String,
}

/// Ranked suggestions, most important first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub suggestions: Vec<NextAction>,
}

impl Suggestions {
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("suggestions".into(), json!(self.suggestions));
        map
    }
}

pub fn call_site(temperature: f32) -> CallSite {
    CallSite {
        name: NAME,
        schema: Schema::suggestions(),
        policies: PolicyTable::replace_all(),
        instructions: instructions(),
        require_complete: true,
        empty_on_missing_payload: false,
        clear_on_empty: false,
        temperature: Some(temperature),
    }
}

pub fn request_for(hcp_name: &str) -> String {
    format!("Suggest the next three actions for {hcp_name}.")
}

/// Extra context lines: days since the most recent interaction.
pub fn facts(last_interaction: NaiveDate, today: NaiveDate) -> Vec<(String, String)> {
    let days = (today - last_interaction).num_days();
    vec![("Days since last interaction".into(), days.to_string())]
}

fn instructions() -> Instructions {
    Instructions {
        task: "You are an expert pharmaceutical sales strategist. Analyze the HCP's interaction \
               history and propose three prioritized, strategic next steps."
            .into(),
        rules: vec![
            "Consider whether the relationship is advancing, stalling or needs repair.".into(),
            "Weigh the opportunities against risks such as a long gap since the last contact or unaddressed concerns.".into(),
            "Return one key, \"suggestions\": a list of exactly three objects, most important first.".into(),
            "Each object has \"suggestion\" (a concrete action) and \"rationale\" (why it is strategic).".into(),
        ],
        examples: vec![WorkedExample::new(
            "Suggest the next three actions for Dr. Rossi.",
            "The relationship is advancing with positive sentiment on the key product. The \
             opportunity is to turn that interest into a first prescription by closing the loop \
             on the last discussion.",
            json!({
                "suggestions": [
                    {
                        "suggestion": "Send the full prescribing information for OncoBoost that was requested.",
                        "rationale": "It answers their request directly and keeps the conversation moving."
                    },
                    {
                        "suggestion": "Propose a short follow-up call next week to discuss patient onboarding.",
                        "rationale": "It moves the discussion from data to practical adoption."
                    },
                    {
                        "suggestion": "Share a case study with a similar patient profile.",
                        "rationale": "It reinforces efficacy in a setting that matches their practice."
                    }
                ]
            }),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_action_uses_suggestion_key() {
        let action: NextAction =
            serde_json::from_value(json!({"suggestion": "Call back", "rationale": "Open question"})).unwrap();
        assert_eq!(action.action, "Call back");
        assert_eq!(serde_json::to_value(&action).unwrap()["suggestion"], "Call back");
    }

    #[test]
    fn days_since_last_interaction() {
        let last = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 8, 19).unwrap();
        assert_eq!(facts(last, today), vec![("Days since last interaction".to_string(), "18".to_string())]);
    }

    #[test]
    fn temperature_is_per_call_site() {
        assert_eq!(call_site(0.5).temperature, Some(0.5));
    }
}
