//! Call-site definitions: one [`CallSite`](crate::engine::CallSite) per
//! use of the pipeline, plus the typed outputs of the produce-only ones.

pub mod converse;
pub mod edit;
pub mod log;
pub mod suggest;
pub mod summarize;

pub use suggest::{NextAction, Suggestions};
pub use summarize::Summary;
