//! Provider trait: the abstraction over the text-completion service.
//!
//! A Provider knows how to send compiled instructions to a generative model
//! and get the raw reply back. The pipeline treats it as an opaque
//! text-in/text-out capability with its own failure modes.
//!
//! Implementations: OpenAI-compatible endpoints (Groq, OpenAI, OpenRouter,
//! Ollama, vLLM) and the retrying wrapper.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::GatewayError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gemma2-9b-it", "gpt-4o-mini")
    pub model: String,

    /// The request messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.0
}

impl ProviderRequest {
    /// A single-message request carrying compiled instructions.
    pub fn instructions(model: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(instructions)],
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The pipeline calls `complete()` without knowing which backend is in use,
/// which lets tests substitute a scripted provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "groq", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, GatewayError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, GatewayError> {
        Ok(true)
    }
}
