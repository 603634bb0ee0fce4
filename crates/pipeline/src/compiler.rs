//! Instruction compiler: turns a call site's task, schema, examples and the
//! current state into one deterministic instruction string.
//!
//! Sections, in order:
//! 1. task statement, output contract, schema and merge rules
//! 2. current state (or narrative context) and today's date
//! 3. worked examples: reasoning then a fenced ```json payload
//! 4. the user's literal request
//!
//! The compiler never reads the clock; "today" is always passed in.

use chrono::NaiveDate;
use fieldscribe_core::EntitySnapshot;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::narrative::NarrativeContext;
use crate::schema::Schema;

/// Replaced by the compile date inside worked examples.
pub const TODAY_PLACEHOLDER: &str = "{today}";

/// A worked example shown to the model.
#[derive(Debug, Clone)]
pub struct WorkedExample {
    pub request: String,
    pub reasoning: String,
    pub payload: Value,
}

impl WorkedExample {
    pub fn new(request: impl Into<String>, reasoning: impl Into<String>, payload: Value) -> Self {
        Self {
            request: request.into(),
            reasoning: reasoning.into(),
            payload,
        }
    }
}

/// The fixed, per-call-site part of an instruction.
#[derive(Debug, Clone)]
pub struct Instructions {
    pub task: String,
    pub rules: Vec<String>,
    pub examples: Vec<WorkedExample>,
}

/// What the model is told about the current state.
#[derive(Debug, Clone, Copy)]
pub enum CallContext<'a> {
    /// A record (or draft) that the reply will be merged into.
    Snapshot(&'a EntitySnapshot),
    /// A digest of prior interactions with `subject`, plus extra facts.
    Narrative {
        subject: &'a str,
        context: &'a NarrativeContext,
        facts: &'a [(String, String)],
    },
}

pub struct InstructionCompiler<'a> {
    instructions: &'a Instructions,
    schema: &'a Schema,
}

impl<'a> InstructionCompiler<'a> {
    pub fn new(instructions: &'a Instructions, schema: &'a Schema) -> Self {
        Self {
            instructions,
            schema,
        }
    }

    pub fn compile(&self, context: CallContext<'_>, request: &str, today: NaiveDate) -> String {
        let today = today.format("%Y-%m-%d").to_string();
        let mut out = String::new();

        self.write_task(&mut out);
        write_context(&mut out, context, &today);
        self.write_examples(&mut out, &today);

        out.push_str("## Request\n");
        out.push_str(request.trim());
        out.push_str("\n\n## Response\n");
        out
    }

    fn write_task(&self, out: &mut String) {
        out.push_str("## Task\n");
        out.push_str(self.instructions.task.trim());
        out.push_str("\n\n");

        out.push_str("Output contract:\n");
        out.push_str("1. First reason step by step inside a <thinking> block.\n");
        out.push_str("2. Then give exactly one JSON object inside a ```json block. Write nothing after it.\n");
        out.push_str("3. Field names are exact and case-sensitive. Enumerated values must be one of the listed literals.\n");
        out.push_str("4. Dates are YYYY-MM-DD. Times are HH:MM. List fields are arrays of short strings.\n\n");

        out.push_str("Fields:\n");
        for field in self.schema.fields() {
            let _ = writeln!(
                out,
                "- {}: {}{}. {}",
                field.name,
                field.kind.describe(),
                if field.required { ", required" } else { "" },
                field.description
            );
        }

        if !self.instructions.rules.is_empty() {
            out.push_str("\nRules:\n");
            for rule in &self.instructions.rules {
                let _ = writeln!(out, "- {rule}");
            }
        }
        out.push('\n');
    }

    fn write_examples(&self, out: &mut String, today: &str) {
        if self.instructions.examples.is_empty() {
            return;
        }
        out.push_str("## Examples\n");
        for (i, example) in self.instructions.examples.iter().enumerate() {
            let _ = writeln!(out, "### Example {}", i + 1);
            let _ = writeln!(out, "Request: {}", example.request.replace(TODAY_PLACEHOLDER, today));
            out.push_str("Response:\n<thinking>\n");
            out.push_str(example.reasoning.replace(TODAY_PLACEHOLDER, today).trim());
            out.push_str("\n</thinking>\n```json\n");
            out.push_str(&sorted_json(&example.payload).replace(TODAY_PLACEHOLDER, today));
            out.push_str("\n```\n\n");
        }
    }
}

fn write_context(out: &mut String, context: CallContext<'_>, today: &str) {
    match context {
        CallContext::Snapshot(snapshot) => {
            out.push_str("## Current state\n");
            let _ = writeln!(out, "Today's date: {today}");
            out.push_str("Current data:\n```json\n");
            out.push_str(&sorted_json(&Value::Object(snapshot.fields.clone())));
            out.push_str("\n```\n\n");
        }
        CallContext::Narrative {
            subject,
            context,
            facts,
        } => {
            out.push_str("## Context\n");
            let _ = writeln!(out, "Today's date: {today}");
            let _ = writeln!(out, "HCP: {subject}");
            for (label, value) in facts {
                let _ = writeln!(out, "{label}: {value}");
            }
            out.push_str("Interaction history (most recent first):\n");
            out.push_str(&context.render());
            out.push_str("\n\n");
        }
    }
}

/// Pretty JSON with object keys sorted at every level.
pub fn sorted_json(value: &Value) -> String {
    serde_json::to_string_pretty(&Sorted(value)).unwrap_or_default()
}

struct Sorted<'a>(&'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let sorted: BTreeMap<&str, Sorted<'_>> =
                    map.iter().map(|(k, v)| (k.as_str(), Sorted(v))).collect();
                sorted.serialize(serializer)
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(Sorted)),
            other => other.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;

    fn instructions() -> Instructions {
        Instructions {
            task: "Extract only the fields the user wants to change.".into(),
            rules: vec!["Base relative dates on today's date.".into()],
            examples: vec![WorkedExample::new(
                "update the date to today",
                "The user wants 'date' set to {today}.",
                json!({"date": "{today}"}),
            )],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 19).unwrap()
    }

    #[test]
    fn sections_appear_in_order() {
        let ins = instructions();
        let schema = Schema::interaction();
        let snapshot = EntitySnapshot::new().with_field("sentiment", json!("Positive"));
        let text = InstructionCompiler::new(&ins, &schema).compile(
            CallContext::Snapshot(&snapshot),
            "change sentiment to neutral",
            today(),
        );

        let task = text.find("## Task").unwrap();
        let state = text.find("## Current state").unwrap();
        let examples = text.find("## Examples").unwrap();
        let request = text.find("## Request").unwrap();
        assert!(task < state && state < examples && examples < request);
        assert!(text.contains("- sentiment: one of \"Positive\", \"Neutral\", \"Negative\", required."));
        assert!(text.contains("- Base relative dates on today's date."));
        assert!(text.trim_end().ends_with("## Response"));
    }

    #[test]
    fn today_is_explicit_and_substituted() {
        let ins = instructions();
        let schema = Schema::interaction();
        let snapshot = EntitySnapshot::new();
        let text = InstructionCompiler::new(&ins, &schema).compile(
            CallContext::Snapshot(&snapshot),
            "x",
            today(),
        );
        assert!(text.contains("Today's date: 2025-08-19"));
        assert!(text.contains("\"date\": \"2025-08-19\""));
        assert!(!text.contains(TODAY_PLACEHOLDER));
    }

    #[test]
    fn compile_is_deterministic_regardless_of_insertion_order() {
        let ins = instructions();
        let schema = Schema::interaction();
        let a = EntitySnapshot::new()
            .with_field("sentiment", json!("Positive"))
            .with_field("date", json!("2025-08-19"));
        let b = EntitySnapshot::new()
            .with_field("date", json!("2025-08-19"))
            .with_field("sentiment", json!("Positive"));
        let compiler = InstructionCompiler::new(&ins, &schema);
        let first = compiler.compile(CallContext::Snapshot(&a), "r", today());
        let second = compiler.compile(CallContext::Snapshot(&b), "r", today());
        assert_eq!(first, second);
        assert_eq!(first, compiler.compile(CallContext::Snapshot(&a), "r", today()));
    }

    #[test]
    fn sorted_json_sorts_nested_keys() {
        let v = json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        let text = sorted_json(&v);
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
        assert!(text.find("\"x\"").unwrap() < text.find("\"y\"").unwrap());
        assert!(text.find("\"a\": 2").unwrap() < text.find("\"z\": 1").unwrap());
    }

    #[test]
    fn narrative_context_lists_facts_and_history() {
        let ins = Instructions {
            task: "Summarize.".into(),
            rules: vec![],
            examples: vec![],
        };
        let schema = Schema::summary();
        let records = vec![crate::test_helpers::record(1, "Dr. Rossi", (2025, 8, 18))];
        let ctx = NarrativeContext::build(&records, 5);
        let facts = vec![("Days since last interaction".to_string(), "1".to_string())];
        let text = InstructionCompiler::new(&ins, &schema).compile(
            CallContext::Narrative {
                subject: "Dr. Rossi",
                context: &ctx,
                facts: &facts,
            },
            "Summarize the history.",
            today(),
        );
        assert!(text.contains("HCP: Dr. Rossi"));
        assert!(text.contains("Days since last interaction: 1"));
        assert!(text.contains("- On 2025-08-18, a Meeting"));
        assert!(!text.contains("## Examples"));
    }
}
