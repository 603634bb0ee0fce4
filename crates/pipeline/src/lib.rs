//! # Field Scribe Pipeline
//!
//! The extract, validate and merge pipeline that turns free-form statements
//! into structured interaction updates.
//!
//! ```text
//! NarrativeContext / EntitySnapshot
//!         │
//!   InstructionCompiler ──► ModelGateway ──► extractor ──► ValidationGate ──► merge
//! ```
//!
//! One generic [`Pipeline`] runs every call site; a [`CallSite`] supplies
//! the schema, worked examples, rules and merge policies.

pub mod compiler;
pub mod engine;
pub mod extractor;
pub mod gateway;
pub mod merge;
pub mod narrative;
pub mod schema;
pub mod service;
pub mod stage;
pub mod validation;
pub mod variants;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use compiler::{CallContext, InstructionCompiler, Instructions, WorkedExample};
pub use engine::{CallSite, Pipeline, ProduceOutput, Run, UpdateOutput};
pub use extractor::{ExtractionOutcome, extract};
pub use gateway::ModelGateway;
pub use merge::{MergePolicy, PolicyTable, merge};
pub use narrative::NarrativeContext;
pub use schema::{FieldKind, FieldSpec, Schema};
pub use service::InteractionService;
pub use stage::{Stage, StageTracker};
pub use validation::{ValidatedUpdate, ValidationGate};
pub use variants::{NextAction, Suggestions, Summary};
