//! Narrative context: a short digest of recent interactions for
//! history-based calls (summaries, next-action suggestions).

use fieldscribe_core::InteractionRecord;

/// Default number of prior interactions in a digest.
pub const DEFAULT_WINDOW: usize = 5;

/// Most-recent-first lines describing prior interactions.
///
/// Rebuilt for every call and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrativeContext {
    lines: Vec<String>,
}

impl NarrativeContext {
    /// Digest up to `window` records. `records` must already be newest first.
    pub fn build(records: &[InteractionRecord], window: usize) -> Self {
        Self {
            lines: records.iter().take(window).map(describe).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// One `- ` bullet per line.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("- {l}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn describe(record: &InteractionRecord) -> String {
    let f = &record.fields;
    let outcome = f
        .outcomes
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or("none recorded");
    format!(
        "On {}, a {} with a '{}' sentiment covered '{}'. Outcome: '{}'.",
        f.date.format("%Y-%m-%d"),
        f.interaction_type,
        f.sentiment,
        f.topics_discussed,
        outcome
    )
}
