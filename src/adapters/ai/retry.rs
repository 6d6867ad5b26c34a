//! Rate-limit retry
//!
//! Only HTTP 429 is retried. The wait grows linearly with the attempt
//! number (`base_delay * attempt`). Every other failure is returned at once.

use std::future::Future;
use std::time::Duration;

use crate::ports::completion::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the given 1-based attempt was rate limited
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `op` until it succeeds, fails with something other than a rate limit,
/// or runs out of attempts. `op` receives the 1-based attempt number.
pub async fn retry_on_rate_limit<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(
                    "{} rate limited (429), attempt {}/{}",
                    provider,
                    attempt,
                    max_attempts
                );
                last_error = Some(e);
                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
            Err(e) => {
                log_failure(provider, &e);
                return Err(e);
            }
        }
    }

    let error = last_error.unwrap_or_else(|| ProviderError::InvalidResponse {
        provider: provider.to_string(),
        reason: "no attempt was made".to_string(),
    });
    tracing::error!("{} still rate limited after {} attempts", provider, max_attempts);
    log_failure(provider, &error);
    Err(error)
}

fn log_failure(provider: &str, error: &ProviderError) {
    tracing::error!("{} API call failed: {}", provider, error);
    if let Some(failure) = error.http_failure() {
        tracing::error!("Status: {}", failure.status);
        tracing::error!("Body: {}", failure.body);
        tracing::error!("Headers: {:?}", failure.headers);
    }
}
