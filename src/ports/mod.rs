//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement:
//! - AI chat-completion providers and the name-keyed provider registry
//! - Messaging transport (signal intake and trade command delivery)

pub mod completion;
pub mod registry;
pub mod transport;
pub mod mocks;

pub use completion::{CompletionProvider, HttpFailure, ProviderError};
pub use registry::ProviderRegistry;
pub use transport::{InboundMessage, MessageTransport, TransportError};
