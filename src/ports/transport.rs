//! Transport Port
//!
//! Messaging session used both to receive signals from the monitored
//! channel and to send trade commands. Login, credential handling and
//! reconnect mechanics live behind this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to send to {recipient}: {reason}")]
    Send { recipient: String, reason: String },

    #[error("Failed to receive updates: {0}")]
    Receive(String),

    #[error("Transport closed")]
    Closed,
}

/// A message seen on the monitored channel
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub chat: String,
    pub message_id: i64,
    /// Plain-text body; `None` for media and service messages
    pub text: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn text(chat: impl Into<String>, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            message_id,
            text: Some(text.into()),
            received_at: Utc::now(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Establish the session, resuming from a saved blob when given.
    /// Returns the account identity that logged in.
    async fn connect(&self, saved_session: Option<String>) -> Result<String, TransportError>;

    /// Opaque blob to persist for the next `connect`
    fn session(&self) -> Option<String>;

    /// Forward messages from `channel` into `sink` until the session fails
    /// or the receiver is dropped
    async fn listen(
        &self,
        channel: &str,
        sink: mpsc::Sender<InboundMessage>,
    ) -> Result<(), TransportError>;

    /// Send a plain-text message
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), TransportError>;
}
