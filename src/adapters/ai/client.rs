//! Chat Completion Client
//!
//! HTTP client for OpenAI-compatible chat-completion endpoints
//! (DeepSeek, OpenAI, and hosted DeepSeek deployments).

use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::retry::{retry_on_rate_limit, RetryPolicy};
use crate::ports::completion::{CompletionProvider, HttpFailure, ProviderError};

/// Sampling and penalty parameters sent with every request
///
/// Unset values are left out of the body so each provider only receives
/// the knobs it understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
}

/// Everything needed to talk to one provider
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub name: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: String,
    pub sampling: SamplingParams,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ProviderSettings {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: None,
            api_url: None,
            model: model.into(),
            sampling: SamplingParams::default(),
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(flatten)]
    sampling: &'a SamplingParams,
}

/// Chat-completion provider over HTTP
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    settings: ProviderSettings,
    http: Client,
}

impl ChatCompletionClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Key and URL, checked before any request goes out
    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        let name = &self.settings.name;
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Configuration(format!("API key for provider '{}' is not configured", name))
            })?;
        let api_url = self
            .settings
            .api_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Configuration(format!("API URL for provider '{}' is not configured", name))
            })?;
        Ok((api_key, api_url))
    }

    async fn send_once(
        &self,
        api_url: &str,
        api_key: &str,
        body: &ChatRequest<'_>,
    ) -> Result<String, ProviderError> {
        let provider = &self.settings.name;

        let response = self
            .http
            .post(api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                provider: provider.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
                .collect();
            let failure = HttpFailure {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
                headers,
            };

            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                ProviderError::RateLimited { provider: provider.clone(), failure }
            } else {
                ProviderError::Http { provider: provider.clone(), failure }
            });
        }

        let json: Value = response.json().await.map_err(|e| ProviderError::InvalidResponse {
            provider: provider.clone(),
            reason: format!("Failed to parse response: {}", e),
        })?;

        extract_content(provider, &json)
    }
}

/// `choices[0].message.content` of a chat-completion body
pub fn extract_content(provider: &str, json: &Value) -> Result<String, ProviderError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: "No content in response".to_string(),
        })
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    fn name(&self) -> &str {
        &self.settings.name
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let (api_key, api_url) = self.credentials()?;

        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            stream: false,
            sampling: &self.settings.sampling,
        };
        let body = &request;

        tracing::debug!("Calling {} ({}) at {}", self.settings.name, self.settings.model, api_url);

        retry_on_rate_limit(&self.settings.name, &self.settings.retry, move |_| {
            self.send_once(api_url, api_key, body)
        })
        .await
    }
}
