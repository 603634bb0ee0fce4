//! Response extractor: recovers a JSON object from free-form model text.
//!
//! Strategies, in order:
//! 1. a fenced block (```` ```json ````, ```` ```JSON ```` or bare ```` ``` ````),
//!    scanned for its first balanced object
//! 2. the first balanced top-level `{...}` span of the whole reply
//!
//! Both use the same brace-balance scan, which ignores braces inside JSON
//! string literals. Nothing here panics on malformed input.

use fieldscribe_core::ExtractionFailure;
use serde_json::{Map, Value};
use tracing::debug;

/// Result of recovering a payload from a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Parsed(Map<String, Value>),
    Failed(ExtractionFailure),
}

impl ExtractionOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn into_result(self) -> Result<Map<String, Value>, ExtractionFailure> {
        match self {
            Self::Parsed(map) => Ok(map),
            Self::Failed(failure) => Err(failure),
        }
    }
}

const FENCES: &[&str] = &["```json", "```JSON", "```"];

/// Recover the structured payload from `raw`.
pub fn extract(raw: &str) -> ExtractionOutcome {
    let candidate = fenced_region(raw)
        .and_then(|(fence, region)| {
            let span = balanced_object(region);
            if span.is_some() {
                debug!(strategy = "fence", fence, "Payload candidate found");
            }
            span
        })
        .or_else(|| {
            let span = balanced_object(raw);
            if span.is_some() {
                debug!(strategy = "brace_scan", "Payload candidate found");
            }
            span
        });

    let Some(candidate) = candidate else {
        return ExtractionOutcome::Failed(ExtractionFailure::NoPayload { raw: raw.to_string() });
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => ExtractionOutcome::Parsed(map),
        Ok(other) => ExtractionOutcome::Failed(ExtractionFailure::PayloadParse {
            reason: format!("expected a JSON object, found {}", kind_of(&other)),
            raw: raw.to_string(),
        }),
        Err(e) => ExtractionOutcome::Failed(ExtractionFailure::PayloadParse {
            reason: e.to_string(),
            raw: raw.to_string(),
        }),
    }
}

/// The text between the first recognized opening fence and its closing fence
/// (or the end of the reply when the closing fence is missing).
fn fenced_region(raw: &str) -> Option<(&'static str, &str)> {
    FENCES.iter().find_map(|fence| {
        let start = raw.find(fence)? + fence.len();
        let rest = &raw[start..];
        let end = rest.find("```").unwrap_or(rest.len());
        Some((*fence, &rest[..end]))
    })
}

/// The first `{...}` span whose braces balance, skipping string contents.
///
/// Returns `None` when no opening brace exists or the text ends before
/// depth returns to zero.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
