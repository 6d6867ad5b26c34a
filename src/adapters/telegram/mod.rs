//! Telegram Adapter
//!
//! Bot API transport: the bot account must be a member of the monitored
//! channel, and the trade recipient must be a chat the bot can post to.

mod client;
mod types;

pub use client::{TelegramConfig, TelegramTransport};
pub use types::{Chat, Message, Update, User};
