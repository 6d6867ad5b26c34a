//! Telegram Bot API Transport
//!
//! `getMe` to establish the session, long-polling `getUpdates` to listen,
//! `sendMessage` for trade commands. The session blob is the next update
//! offset, so a restart resumes after the last update it consumed.

use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

use super::types::{ApiResponse, GetUpdatesRequest, SendMessageRequest, Update, User};
use crate::ports::transport::{InboundMessage, MessageTransport, TransportError};

const ALLOWED_UPDATES: &[&str] = &["channel_post", "message"];

/// Telegram transport configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Base URL for the Bot API
    pub api_base_url: String,
    /// Checked when connecting, not when constructing
    pub bot_token: Option<String>,
    /// Long-poll timeout for getUpdates
    pub poll_timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".to_string(),
            bot_token: None,
            poll_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    offset: Option<i64>,
}

#[derive(Debug)]
pub struct TelegramTransport {
    config: TelegramConfig,
    http: Client,
    state: Mutex<SessionState>,
}

impl TelegramTransport {
    pub fn new(config: TelegramConfig) -> Result<Self, TransportError> {
        // Request timeout must outlast the long poll
        let http = Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(15))
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            state: Mutex::new(SessionState::default()),
        })
    }

    fn method_url(&self, method: &str) -> Result<String, TransportError> {
        let token = self
            .config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TransportError::Auth("Telegram bot token is not configured".to_string()))?;
        Ok(format!(
            "{}/bot{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            token,
            method
        ))
    }

    fn offset(&self) -> Option<i64> {
        self.state.lock().ok().and_then(|s| s.offset)
    }

    fn set_offset(&self, offset: i64) {
        if let Ok(mut state) = self.state.lock() {
            state.offset = Some(offset);
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let url = self.method_url(method)?;

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Connect(format!("{} request failed: {}", method, e.without_url())))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Receive(format!("{}: invalid response: {}", method, e.without_url())))?;

        if !envelope.ok {
            let description = envelope
                .description
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(match envelope.error_code.unwrap_or(status.as_u16()) {
                401 | 403 | 404 => TransportError::Auth(format!("{}: {}", method, description)),
                _ => TransportError::Receive(format!("{}: {}", method, description)),
            });
        }

        envelope
            .result
            .ok_or_else(|| TransportError::Receive(format!("{}: missing result", method)))
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn connect(&self, saved_session: Option<String>) -> Result<String, TransportError> {
        if let Some(blob) = saved_session {
            match blob.trim().parse::<i64>() {
                Ok(offset) => self.set_offset(offset),
                Err(_) => tracing::warn!("Ignoring malformed saved session"),
            }
        }

        let me: User = self.call("getMe", &serde_json::json!({})).await?;
        Ok(me.handle())
    }

    fn session(&self) -> Option<String> {
        self.offset().map(|o| o.to_string())
    }

    async fn listen(
        &self,
        channel: &str,
        sink: mpsc::Sender<InboundMessage>,
    ) -> Result<(), TransportError> {
        tracing::info!("Polling Telegram updates for {}", channel);

        loop {
            let request = GetUpdatesRequest {
                offset: self.offset(),
                timeout: self.config.poll_timeout.as_secs(),
                allowed_updates: ALLOWED_UPDATES,
            };
            let updates: Vec<Update> = self.call("getUpdates", &request).await?;

            for update in updates {
                self.set_offset(update.update_id + 1);

                let Some(message) = update.into_message() else {
                    continue;
                };
                if !message.chat.matches(channel) {
                    continue;
                }
                if sink.send(message.into_inbound()).await.is_err() {
                    return Ok(());
                }
            }
        }
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), TransportError> {
        let request = SendMessageRequest { chat_id: recipient, text };
        let _: serde_json::Value = self
            .call("sendMessage", &request)
            .await
            .map_err(|e| TransportError::Send {
                recipient: recipient.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
