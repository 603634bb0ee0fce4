//! Model gateway: the explicit handle every pipeline call goes through.
//!
//! Built once from config and passed to the pipeline. It sends nothing but
//! the compiled instruction, and every call runs under a deadline.

use fieldscribe_core::{GatewayError, Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    deadline: Duration,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            deadline: Duration::from_secs(60),
        }
    }

    /// Build from config. A `[providers.<default>]` model wins over
    /// `default_model`. The deadline is the worst case of the retrying
    /// provider, rate-limit waits included.
    pub fn from_config(provider: Arc<dyn Provider>, config: &fieldscribe_config::AppConfig) -> Self {
        let deadline = config.model_gateway.worst_case();

        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        Self::new(provider, model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_deadline(deadline)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send `instructions` and return the raw reply text.
    pub async fn complete(&self, instructions: &str) -> Result<String, GatewayError> {
        self.complete_with(instructions, None).await
    }

    /// Like [`complete`](Self::complete) with an optional temperature override.
    pub async fn complete_with(
        &self,
        instructions: &str,
        temperature: Option<f32>,
    ) -> Result<String, GatewayError> {
        let mut request = ProviderRequest::instructions(&self.model, instructions);
        request.temperature = temperature.unwrap_or(self.temperature);
        request.max_tokens = self.max_tokens;

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            temperature = request.temperature,
            chars = instructions.len(),
            "Invoking model"
        );

        match tokio::time::timeout(self.deadline, self.provider.complete(request)).await {
            Ok(Ok(response)) => Ok(response.message.content),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GatewayError::Timeout(format!(
                "model call exceeded {}s",
                self.deadline.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;

    #[tokio::test]
    async fn returns_reply_text_and_sends_instructions_only() {
        let provider = Arc::new(ScriptedProvider::replies(&["```json\n{}\n```"]));
        let gateway = ModelGateway::new(provider.clone(), "gemma2-9b-it").with_temperature(0.0);

        let text = gateway.complete("compiled instructions").await.unwrap();
        assert_eq!(text, "```json\n{}\n```");

        let request = provider.last_request().unwrap();
        assert_eq!(request.model, "gemma2-9b-it");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "compiled instructions");
    }

    #[tokio::test]
    async fn temperature_override_applies_to_one_call() {
        let provider = Arc::new(ScriptedProvider::replies(&["a", "b"]));
        let gateway = ModelGateway::new(provider.clone(), "m");

        gateway.complete_with("x", Some(0.5)).await.unwrap();
        assert_eq!(provider.last_request().unwrap().temperature, 0.5);
        gateway.complete("x").await.unwrap();
        assert_eq!(provider.last_request().unwrap().temperature, 0.0);
    }

    #[tokio::test]
    async fn gateway_errors_pass_through() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(GatewayError::Unauthorized(
            "bad key".into(),
        ))]));
        let gateway = ModelGateway::new(provider, "m");
        assert!(matches!(
            gateway.complete("x").await,
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_hits_deadline() {
        let provider = Arc::new(ScriptedProvider::replies(&["late"]).with_delay(Duration::from_secs(30)));
        let gateway = ModelGateway::new(provider, "m").with_deadline(Duration::from_secs(5));
        assert!(matches!(
            gateway.complete("x").await,
            Err(GatewayError::Timeout(_))
        ));
    }

    #[test]
    fn deadline_covers_retries() {
        let mut config = fieldscribe_config::AppConfig::default();
        config.model_gateway.timeout_secs = 10;
        config.model_gateway.max_retries = 2;
        config.model_gateway.backoff_ms = 500;
        let gateway = ModelGateway::from_config(Arc::new(ScriptedProvider::replies(&[])), &config);
        // 3 attempts of 10s, plus two waits at the 30s retry-after cap
        assert_eq!(gateway.deadline, Duration::from_secs(90));
        assert_eq!(gateway.model(), "gemma2-9b-it");
    }

    #[test]
    fn provider_model_overrides_default() {
        let mut config = fieldscribe_config::AppConfig::default();
        config.providers.insert(
            "groq".into(),
            fieldscribe_config::ProviderConfig {
                default_model: Some("llama-3.1-8b-instant".into()),
                ..Default::default()
            },
        );
        let gateway = ModelGateway::from_config(Arc::new(ScriptedProvider::replies(&[])), &config);
        assert_eq!(gateway.model(), "llama-3.1-8b-instant");
    }
}
