//! Bounded retry with exponential backoff for throttled backend calls.
//!
//! This is the only place a backend call is retried. Every failure other than
//! a rate limit is returned to the caller after the first attempt.

use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::{Result, TranslateError};
use crate::translate::TranslationBackend;

/// Total attempts per window, the first call included
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff before retry `n` (0-based) is `BASE_BACKOFF * 2^n`
pub const BASE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RateLimitInvoker {
    max_attempts: u32,
    base_delay: Duration,
    call_timeout: Option<Duration>,
}

impl Default for RateLimitInvoker {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_BACKOFF,
            call_timeout: None,
        }
    }
}

impl RateLimitInvoker {
    /// Default policy with a hard limit on each backend call
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            call_timeout: Some(call_timeout),
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the failed attempt number `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Call the backend for `texts`, retrying only on rate limits.
    ///
    /// A single text goes through the backend's unnumbered single-text path.
    /// When every attempt is throttled the last rate-limit error is returned;
    /// there is no wait after the final attempt.
    pub async fn invoke(
        &self,
        backend: &dyn TranslationBackend,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<String>> {
        let mut attempt = 0;
        loop {
            match self.call_once(backend, texts, target_language).await {
                Err(e) if e.is_rate_limited() => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        warn!("Still rate limited after {} attempts", attempt);
                        return Err(e);
                    }
                    let delay = self.backoff_delay(attempt - 1);
                    warn!(
                        "Rate limited, retrying in {:?} (attempt {}/{})",
                        delay,
                        attempt + 1,
                        self.max_attempts
                    );
                    sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn call_once(
        &self,
        backend: &dyn TranslationBackend,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<String>> {
        debug!("Invoking backend for {} texts", texts.len());
        let call = async {
            match texts {
                [text] => backend
                    .translate_single(text, target_language)
                    .await
                    .map(|translated| vec![translated]),
                _ => backend.translate_batch(texts, target_language).await,
            }
        };

        match self.call_timeout {
            Some(limit) => timeout(limit, call).await.map_err(|_| TranslateError::Network {
                provider: backend.provider().to_string(),
                message: format!("request timed out after {:?}", limit),
            })?,
            None => call.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::translate::MockTranslationBackend;
    use async_trait::async_trait;
    use tokio::time::Instant;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn rate_limited() -> TranslateError {
        TranslateError::RateLimited { provider: "Groq".to_string() }
    }

    #[test]
    fn test_backoff_doubles() {
        let invoker = RateLimitInvoker::default();
        assert_eq!(invoker.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(invoker.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(invoker.backoff_delay(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_throttling_then_succeeds() {
        let mut backend = MockTranslationBackend::new();
        let mut calls = 0;
        backend.expect_translate_batch().times(3).returning(move |texts, _| {
            calls += 1;
            if calls <= 2 {
                Err(rate_limited())
            } else {
                Ok(texts.iter().map(|t| format!("vi:{}", t)).collect())
            }
        });

        let start = Instant::now();
        let result = RateLimitInvoker::default()
            .invoke(&backend, &texts(&["a", "b"]), "vi")
            .await
            .unwrap();

        assert_eq!(result, texts(&["vi:a", "vi:b"]));
        // 1s after the first failure, 2s after the second
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let mut backend = MockTranslationBackend::new();
        backend
            .expect_translate_batch()
            .times(3)
            .returning(|_, _| Err(rate_limited()));

        let start = Instant::now();
        let err = RateLimitInvoker::default()
            .invoke(&backend, &texts(&["a", "b"]), "vi")
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_not_retried() {
        let mut backend = MockTranslationBackend::new();
        backend.expect_translate_batch().times(1).returning(|_, _| {
            Err(TranslateError::Server { provider: "Groq".to_string(), status: 500 })
        });

        let start = Instant::now();
        let err = RateLimitInvoker::default()
            .invoke(&backend, &texts(&["a", "b"]), "vi")
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::Server { status: 500, .. }));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let mut backend = MockTranslationBackend::new();
        backend.expect_translate_batch().times(1).returning(|_, _| {
            Err(TranslateError::Auth { provider: "Groq".to_string(), status: 401 })
        });

        let err = RateLimitInvoker::default()
            .invoke(&backend, &texts(&["a", "b"]), "vi")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_single_text_uses_single_path() {
        let mut backend = MockTranslationBackend::new();
        backend.expect_translate_batch().never();
        backend
            .expect_translate_single()
            .withf(|text, lang| text == "Hello" && lang == "vi")
            .times(1)
            .returning(|_, _| Ok("Xin chào".to_string()));

        let result = RateLimitInvoker::default()
            .invoke(&backend, &texts(&["Hello"]), "vi")
            .await
            .unwrap();
        assert_eq!(result, texts(&["Xin chào"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_text_throttling_is_retried_too() {
        let mut backend = MockTranslationBackend::new();
        let mut calls = 0;
        backend.expect_translate_single().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 { Err(rate_limited()) } else { Ok("ok".to_string()) }
        });

        let start = Instant::now();
        let result = RateLimitInvoker::default()
            .invoke(&backend, &texts(&["x"]), "vi")
            .await
            .unwrap();
        assert_eq!(result, texts(&["ok"]));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    struct HangingBackend;

    #[async_trait]
    impl TranslationBackend for HangingBackend {
        fn provider(&self) -> ProviderKind {
            ProviderKind::Cerebras
        }

        fn model(&self) -> String {
            "slow".to_string()
        }

        async fn translate_batch(&self, _texts: &[String], _target_language: &str) -> Result<Vec<String>> {
            sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn fetch_available_models(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out_as_network_error() {
        let invoker = RateLimitInvoker::new(Duration::from_secs(30));
        let start = Instant::now();
        let err = invoker
            .invoke(&HangingBackend, &texts(&["a", "b"]), "vi")
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::Network { .. }));
        assert!(err.is_classified());
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let mut backend = MockTranslationBackend::new();
        backend
            .expect_translate_batch()
            .times(1)
            .returning(|_, _| Err(rate_limited()));

        let invoker = RateLimitInvoker::default().with_policy(1, Duration::from_millis(10));
        assert_eq!(invoker.max_attempts(), 1);
        let err = invoker.invoke(&backend, &texts(&["a", "b"]), "vi").await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}
