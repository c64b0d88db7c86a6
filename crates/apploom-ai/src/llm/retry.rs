//! Backoff handling shared by the provider HTTP clients.

use std::time::Duration;

use reqwest::Response;

use crate::error::AiError;

/// How transient provider failures are retried. Each retry doubles the
/// delay, capped at `max_delay`; a server-sent Retry-After wins outright.
#[derive(Debug, Clone)]
pub struct LlmRetryConfig {
    /// Retries after the initial request.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl LlmRetryConfig {
    /// Delay before retry `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32, server_hint_secs: Option<u64>) -> Duration {
        if let Some(seconds) = server_hint_secs {
            return Duration::from_secs(seconds);
        }
        let doublings = attempt.saturating_sub(1).min(32);
        let delay = self.base_delay.saturating_mul(1u32 << doublings);
        delay.min(self.max_delay)
    }
}

/// Log and sleep before retry `attempt` (1-based).
pub async fn wait_before_retry(
    config: &LlmRetryConfig,
    provider: &str,
    attempt: u32,
    server_hint_secs: Option<u64>,
) {
    let delay = config.backoff_delay(attempt, server_hint_secs);
    tracing::warn!(
        provider,
        attempt,
        delay_ms = delay.as_millis() as u64,
        "Retrying LLM request"
    );
    tokio::time::sleep(delay).await;
}

/// Integer Retry-After header, if the provider sent one.
pub fn retry_after_hint(response: &Response) -> Option<u64> {
    let header = response.headers().get("retry-after")?;
    header.to_str().ok()?.parse().ok()
}

/// Consume a non-2xx response into an HTTP error, keeping the status and
/// a bounded slice of the body.
pub async fn error_from_response(response: Response, provider: &str) -> AiError {
    const BODY_LIMIT: usize = 512;

    let status = response.status().as_u16();
    let hint = retry_after_hint(&response);
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > BODY_LIMIT {
        let mut cut = BODY_LIMIT;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
        message.push_str("... [truncated]");
    }

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message,
        retry_after_secs: hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let config = LlmRetryConfig::default();
        let millis: Vec<u128> = (1..=6)
            .map(|n| config.backoff_delay(n, None).as_millis())
            .collect();
        assert_eq!(millis, vec![200, 400, 800, 1600, 3200, 5000]);
    }

    #[test]
    fn server_hint_overrides_backoff() {
        let config = LlmRetryConfig::default();
        assert_eq!(config.backoff_delay(3, Some(10)), Duration::from_secs(10));
    }

    #[test]
    fn http_status_drives_retryability() {
        let http = |status: u16| AiError::LlmHttp {
            provider: "test".into(),
            status,
            message: String::new(),
            retry_after_secs: None,
        };
        assert!(http(429).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(401).is_retryable());
    }

    #[test]
    fn bare_llm_errors_retry_on_rate_limit_text() {
        assert!(AiError::Llm("rate limit exceeded".into()).is_retryable());
        assert!(!AiError::Llm("bad request".into()).is_retryable());
    }
}
