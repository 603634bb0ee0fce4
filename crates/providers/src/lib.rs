//! Model provider implementations for Field Scribe.
//!
//! All providers implement the `fieldscribe_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryingProvider;
pub use router::ProviderRouter;
