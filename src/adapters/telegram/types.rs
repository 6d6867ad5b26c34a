//! Telegram Bot API Types
//!
//! The subset of Bot API objects the transport reads.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::transport::InboundMessage;

/// Envelope every Bot API method returns
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// `@username`, falling back to the numeric id
    pub fn handle(&self) -> String {
        match &self.username {
            Some(name) => format!("@{}", name),
            None => self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub channel_post: Option<Message>,
}

impl Update {
    /// Channel post or group/private message carried by this update
    pub fn into_message(self) -> Option<Message> {
        self.channel_post.or(self.message)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    /// Unix seconds
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    pub fn into_inbound(self) -> InboundMessage {
        let received_at: DateTime<Utc> = Utc
            .timestamp_opt(self.date, 0)
            .single()
            .unwrap_or_else(Utc::now);
        InboundMessage {
            chat: self.chat.display_name(),
            message_id: self.message_id,
            text: self.text,
            received_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    /// Whether this chat is the configured channel
    ///
    /// `channel` may be `@name`, `name` (case-insensitive) or the numeric id.
    pub fn matches(&self, channel: &str) -> bool {
        let wanted = channel.trim();
        if wanted == self.id.to_string() {
            return true;
        }
        let wanted = wanted.trim_start_matches('@');
        self.username
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
    }

    pub fn display_name(&self) -> String {
        match (&self.username, &self.title) {
            (Some(name), _) => format!("@{}", name),
            (None, Some(title)) => title.clone(),
            (None, None) => self.id.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: &'a [&'a str],
}
