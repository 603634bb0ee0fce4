//! Retrying provider: per-attempt timeouts with bounded, backed-off retries.
//!
//! Every call made through this wrapper is bounded by a timeout; an expired
//! attempt becomes `GatewayError::Timeout`. Transient failures (unavailable,
//! rate limited, timed out) are retried up to `max_retries` times with
//! exponential backoff. A rate limit waits at least its `Retry-After`,
//! capped at `max_retry_after`. Authorization failures are returned
//! immediately.
//! With `max_retries = 0` the first failure is terminal.

use async_trait::async_trait;
use fieldscribe_core::error::GatewayError;
use fieldscribe_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that wraps another provider with a timeout and retry policy.
pub struct RetryingProvider {
    inner: Arc<dyn fieldscribe_core::Provider>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
    max_retry_after: Duration,
}

impl RetryingProvider {
    /// Wrap `inner` with a 60s timeout and no retries.
    pub fn new(inner: Arc<dyn fieldscribe_core::Provider>) -> Self {
        Self {
            inner,
            timeout: Duration::from_secs(60),
            max_retries: 0,
            backoff: Duration::from_millis(500),
            max_retry_after: Duration::from_secs(30),
        }
    }

    /// Build from the `[model_gateway]` config section.
    pub fn from_config(
        inner: Arc<dyn fieldscribe_core::Provider>,
        config: &fieldscribe_config::ModelGatewayConfig,
    ) -> Self {
        Self::new(inner)
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_max_retries(config.max_retries)
            .with_backoff(Duration::from_millis(config.backoff_ms))
            .with_max_retry_after(Duration::from_secs(config.max_retry_after_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_retry_after(mut self, cap: Duration) -> Self {
        self.max_retry_after = cap;
        self
    }

    /// Delay before retry number `retry` (0-based).
    fn delay_for(&self, retry: u32, error: &GatewayError) -> Duration {
        let exponential = self.backoff.saturating_mul(2u32.saturating_pow(retry));
        match error {
            GatewayError::RateLimited { retry_after_secs } => {
                exponential.max(Duration::from_secs(*retry_after_secs).min(self.max_retry_after))
            }
            _ => exponential,
        }
    }
}

#[async_trait]
impl fieldscribe_core::Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, GatewayError> {
        let provider_name = self.inner.name().to_string();
        let mut retry = 0;

        loop {
            let error = match tokio::time::timeout(self.timeout, self.inner.complete(request.clone()))
                .await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => e,
                Err(_) => GatewayError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    provider_name,
                    self.timeout.as_secs()
                )),
            };

            if !error.is_transient() || retry >= self.max_retries {
                warn!(
                    provider = %provider_name,
                    error = %error,
                    attempts = retry + 1,
                    "Model call failed"
                );
                return Err(error);
            }

            let delay = self.delay_for(retry, &error);
            info!(
                provider = %provider_name,
                error = %error,
                retry = retry + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Transient model failure, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    async fn health_check(&self) -> std::result::Result<bool, GatewayError> {
        match tokio::time::timeout(self.timeout, self.inner.health_check()).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(format!(
                "Health check for '{}' timed out",
                self.inner.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscribe_core::Provider;
    use fieldscribe_core::message::Message;
    use std::sync::Mutex;

    /// A mock provider that fails with scripted errors, then succeeds.
    struct FlakyProvider {
        failures: Mutex<Vec<GatewayError>>,
        call_count: Mutex<usize>,
    }

    impl FlakyProvider {
        fn new(failures: Vec<GatewayError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl fieldscribe_core::Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, GatewayError> {
            *self.call_count.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok(ProviderResponse {
                    message: Message::assistant("success"),
                    usage: None,
                    model: "test-model".into(),
                })
            } else {
                Err(failures.remove(0))
            }
        }
    }

    /// A mock provider that hangs forever (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl fieldscribe_core::Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, GatewayError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(GatewayError::Unavailable("woke up".into()))
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest::instructions("test", "hello")
    }

    #[tokio::test(start_paused = true)]
    async fn success_passes_through() {
        let inner = Arc::new(FlakyProvider::new(vec![]));
        let provider = RetryingProvider::new(inner.clone()).with_max_retries(3);

        let result = provider.complete(test_request()).await.unwrap();
        assert_eq!(result.message.content, "success");
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_retry_by_default() {
        let inner = Arc::new(FlakyProvider::new(vec![GatewayError::Unavailable(
            "503".into(),
        )]));
        let provider = RetryingProvider::new(inner.clone());

        let result = provider.complete(test_request()).await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let inner = Arc::new(FlakyProvider::new(vec![
            GatewayError::Unavailable("503".into()),
            GatewayError::RateLimited { retry_after_secs: 1 },
        ]));
        let provider = RetryingProvider::new(inner.clone()).with_max_retries(2);

        let result = provider.complete(test_request()).await;
        assert!(result.is_ok());
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let inner = Arc::new(FlakyProvider::new(vec![
            GatewayError::Unavailable("1".into()),
            GatewayError::Unavailable("2".into()),
            GatewayError::Unavailable("3".into()),
        ]));
        let provider = RetryingProvider::new(inner.clone()).with_max_retries(1);

        match provider.complete(test_request()).await {
            Err(GatewayError::Unavailable(msg)) => assert_eq!(msg, "2"),
            other => panic!("Expected Unavailable, got: {other:?}"),
        }
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_is_never_retried() {
        let inner = Arc::new(FlakyProvider::new(vec![GatewayError::Unauthorized(
            "bad key".into(),
        )]));
        let provider = RetryingProvider::new(inner.clone()).with_max_retries(5);

        let result = provider.complete(test_request()).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized(_))));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_call_becomes_timeout() {
        let provider = RetryingProvider::new(Arc::new(HangingProvider))
            .with_timeout(Duration::from_millis(50));

        match provider.complete(test_request()).await {
            Err(GatewayError::Timeout(msg)) => assert!(msg.contains("hanging")),
            other => panic!("Expected Timeout, got: {other:?}"),
        }
    }

    #[test]
    fn backoff_doubles_and_honours_retry_after() {
        let provider = RetryingProvider::new(Arc::new(HangingProvider))
            .with_backoff(Duration::from_millis(100));
        let unavailable = GatewayError::Unavailable("x".into());
        assert_eq!(provider.delay_for(0, &unavailable), Duration::from_millis(100));
        assert_eq!(provider.delay_for(2, &unavailable), Duration::from_millis(400));

        let limited = GatewayError::RateLimited { retry_after_secs: 3 };
        assert_eq!(provider.delay_for(0, &limited), Duration::from_secs(3));
    }

    #[test]
    fn retry_after_is_capped() {
        let provider = RetryingProvider::new(Arc::new(HangingProvider))
            .with_backoff(Duration::from_millis(100))
            .with_max_retry_after(Duration::from_secs(10));
        let limited = GatewayError::RateLimited { retry_after_secs: 3600 };
        assert_eq!(provider.delay_for(0, &limited), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_call_finishes_within_worst_case() {
        let config = fieldscribe_config::ModelGatewayConfig {
            timeout_secs: 10,
            max_retries: 1,
            backoff_ms: 500,
            max_retry_after_secs: 30,
        };
        let inner = Arc::new(FlakyProvider::new(vec![GatewayError::RateLimited {
            retry_after_secs: 5,
        }]));
        let provider = RetryingProvider::from_config(inner.clone(), &config);

        let started = tokio::time::Instant::now();
        provider.complete(test_request()).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed <= config.worst_case());
        assert_eq!(inner.calls(), 2);
    }

    #[test]
    fn config_values_are_applied() {
        let config = fieldscribe_config::ModelGatewayConfig {
            timeout_secs: 5,
            max_retries: 2,
            backoff_ms: 250,
            max_retry_after_secs: 12,
        };
        let provider = RetryingProvider::from_config(Arc::new(HangingProvider), &config);
        assert_eq!(provider.timeout, Duration::from_secs(5));
        assert_eq!(provider.max_retries, 2);
        assert_eq!(provider.backoff, Duration::from_millis(250));
        assert_eq!(provider.max_retry_after, Duration::from_secs(12));
        assert_eq!(provider.name(), "hanging");
    }
}
