//! Replay Transport
//!
//! Paper-mode transport: delivers signals read from a file and logs trade
//! commands instead of sending them.

use std::path::Path;
use std::sync::Mutex;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ports::transport::{InboundMessage, MessageTransport, TransportError};

/// Line separating signals in a replay file
pub const SIGNAL_SEPARATOR: &str = "---";

const REPLAY_CHAT: &str = "replay";

/// Split a replay file into signals
///
/// Signals are separated by lines consisting of `---`; blank signals are dropped.
pub fn split_signals(content: &str) -> Vec<String> {
    let mut signals = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim() == SIGNAL_SEPARATOR {
            push_signal(&mut signals, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_signal(&mut signals, &current);
    signals
}

fn push_signal(signals: &mut Vec<String>, lines: &[&str]) {
    let text = lines.join("\n");
    let text = text.trim();
    if !text.is_empty() {
        signals.push(text.to_string());
    }
}

#[derive(Debug, Default)]
pub struct ReplayTransport {
    signals: Vec<String>,
    sent: Mutex<Vec<(String, String)>>,
}

impl ReplayTransport {
    pub fn new(signals: Vec<String>) -> Self {
        Self {
            signals,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, TransportError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TransportError::Connect(format!("Cannot read {}: {}", path.display(), e)))?;
        let signals = split_signals(&content);
        tracing::info!("Loaded {} signals from {}", signals.len(), path.display());
        Ok(Self::new(signals))
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Commands that would have been sent, as (recipient, text)
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageTransport for ReplayTransport {
    fn name(&self) -> &str {
        "replay"
    }

    async fn connect(&self, _saved_session: Option<String>) -> Result<String, TransportError> {
        Ok("paper-trader".to_string())
    }

    fn session(&self) -> Option<String> {
        None
    }

    async fn listen(
        &self,
        _channel: &str,
        sink: mpsc::Sender<InboundMessage>,
    ) -> Result<(), TransportError> {
        for (i, signal) in self.signals.iter().enumerate() {
            let message = InboundMessage::text(REPLAY_CHAT, i as i64 + 1, signal.clone());
            if sink.send(message).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), TransportError> {
        tracing::warn!("[PAPER] Would send to {}: {}", recipient, text);
        self.sent
            .lock()
            .map_err(|e| TransportError::Send {
                recipient: recipient.to_string(),
                reason: e.to_string(),
            })?
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}
