//! AI provider adapters
//!
//! OpenAI-compatible chat-completion client, the rate-limit retry loop,
//! and registry construction from configured providers.

pub mod client;
pub mod registry;
pub mod retry;

pub use client::{ChatCompletionClient, ProviderSettings, SamplingParams};
pub use retry::{retry_on_rate_limit, RetryPolicy};
