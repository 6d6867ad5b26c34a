//! Signal Bot - AI verdicts on Telegram trading alerts
//!
//! Parses KOL Buy / ATH Price alerts, asks an LLM provider whether to buy,
//! and sends `/buy <address> <amount>` to a trading bot on a positive verdict.
//!
//! # Modules
//!
//! - `domain`: Signal parsing, verdict extraction, trade history
//! - `ports`: Trait abstractions (CompletionProvider, MessageTransport)
//! - `adapters`: External implementations (AI providers, Telegram, replay, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Analysis, decision, dispatch, evolution and the bot loop

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
