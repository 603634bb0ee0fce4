//! # Field Scribe Core
//!
//! Domain types, traits, and error definitions for Field Scribe, which turns
//! free-form statements about HCP interactions into structured record
//! updates. This crate has **no framework dependencies**: it defines the
//! domain model the other crates implement against.
//!
//! ## Seams
//!
//! - [`Provider`]: the external text-completion service
//! - [`RecordStore`]: persistence of interaction records
//!
//! Both are traits so tests can substitute scripted or in-memory versions.

pub mod error;
pub mod message;
pub mod provider;
pub mod interaction;
pub mod snapshot;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ExtractionFailure, GatewayError, Result, StoreError, ValidationError};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use interaction::{InteractionFields, InteractionRecord, InteractionType, Sentiment};
pub use snapshot::EntitySnapshot;
pub use store::{HistoryPage, HistoryQuery, RecordStore};
