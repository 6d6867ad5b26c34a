//! Completion Port
//!
//! Uniform interface over chat-completion AI providers.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Diagnostics captured from a failed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.body)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Missing key or URL; raised before any request is made
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// HTTP 429, the only retryable failure
    #[error("Rate limited by {provider}: {failure}")]
    RateLimited { provider: String, failure: HttpFailure },

    #[error("{provider} API error: {failure}")]
    Http { provider: String, failure: HttpFailure },

    #[error("Network error calling {provider}: {reason}")]
    Network { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// HTTP status, when the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::RateLimited { failure, .. } | ProviderError::Http { failure, .. } => {
                Some(failure.status)
            }
            _ => None,
        }
    }

    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            ProviderError::RateLimited { failure, .. } | ProviderError::Http { failure, .. } => {
                Some(failure)
            }
            _ => None,
        }
    }
}

/// A named chat-completion service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Registry name (e.g. `deepseek`)
    fn name(&self) -> &str;

    /// Send one system + user prompt pair and return the reply text
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;
}
