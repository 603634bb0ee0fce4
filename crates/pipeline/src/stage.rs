//! Pipeline stages and the tracker that keeps every run moving forward.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Started,
    ContextBuilt,
    InstructionCompiled,
    GatewayInvoked,
    GatewayFailed,
    ExtractionFailed,
    Parsed,
    ValidationFailed,
    Validated,
    Merged,
    Produced,
}

impl Stage {
    /// Stages that may directly follow this one. Terminal stages have none.
    pub fn successors(self) -> &'static [Stage] {
        use Stage::*;
        match self {
            Started => &[ContextBuilt],
            // An empty history short-circuits straight to a fixed result.
            ContextBuilt => &[InstructionCompiled, Produced],
            InstructionCompiled => &[GatewayInvoked, GatewayFailed],
            GatewayInvoked => &[ExtractionFailed, Parsed],
            Parsed => &[ValidationFailed, Validated],
            // Completeness is checked on the merged candidate.
            Validated => &[ValidationFailed, Merged, Produced],
            GatewayFailed | ExtractionFailed | ValidationFailed | Merged | Produced => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::GatewayFailed | Self::ExtractionFailed | Self::ValidationFailed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::ContextBuilt => "context_built",
            Self::InstructionCompiled => "instruction_compiled",
            Self::GatewayInvoked => "gateway_invoked",
            Self::GatewayFailed => "gateway_failed",
            Self::ExtractionFailed => "extraction_failed",
            Self::Parsed => "parsed",
            Self::ValidationFailed => "validation_failed",
            Self::Validated => "validated",
            Self::Merged => "merged",
            Self::Produced => "produced",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attempted move to a stage that cannot follow the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: Stage,
    pub to: Stage,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal pipeline transition {} -> {}", self.from, self.to)
    }
}

/// Records the stages of one run, in order.
#[derive(Debug, Clone)]
pub struct StageTracker {
    trail: Vec<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            trail: vec![Stage::Started],
        }
    }

    pub fn current(&self) -> Stage {
        self.trail.last().copied().unwrap_or(Stage::Started)
    }

    pub fn advance(&mut self, next: Stage) -> Result<(), IllegalTransition> {
        let from = self.current();
        if !from.successors().contains(&next) {
            return Err(IllegalTransition { from, to: next });
        }
        self.trail.push(next);
        Ok(())
    }

    pub fn trail(&self) -> &[Stage] {
        &self.trail
    }

    pub fn into_trail(self) -> Vec<Stage> {
        self.trail
    }

    /// `started > context_built > ...`, for logs.
    pub fn render(&self) -> String {
        self.trail
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
