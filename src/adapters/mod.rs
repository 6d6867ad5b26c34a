//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - AI: OpenAI-compatible chat-completion providers and their registry
//! - Telegram: Bot API transport for signal intake and /buy delivery
//! - Replay: paper-mode transport fed from a signal file
//! - CLI: Command-line interface handlers

pub mod ai;
pub mod telegram;
pub mod replay;
pub mod cli;

pub use ai::ChatCompletionClient;
pub use telegram::TelegramTransport;
pub use replay::ReplayTransport;
pub use cli::CliApp;
