//! Scripted port implementations for tests and dry runs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::completion::{CompletionProvider, ProviderError};
use super::transport::{InboundMessage, MessageTransport, TransportError};

/// Mock provider that replays queued replies and records every prompt
#[derive(Debug, Default, Clone)]
pub struct MockProvider {
    name: String,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    responses: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    fallback: Option<String>,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Builder method to queue a successful reply
    pub fn with_response(self, text: &str) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    /// Builder method to queue a failure
    pub fn with_error(self, error: ProviderError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Reply used once the queue is empty
    pub fn with_fallback(mut self, text: &str) -> Self {
        self.fallback = Some(text.to_string());
        self
    }

    /// Get all recorded (system, user) prompt pairs
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        let queued = self.responses.lock().unwrap().pop_front();
        match (queued, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(ProviderError::InvalidResponse {
                provider: self.name.clone(),
                reason: "No response configured".to_string(),
            }),
        }
    }
}

/// Mock transport that records outbound messages and replays inbound ones
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    connect_failures: Arc<Mutex<u32>>,
    connect_calls: Arc<Mutex<u32>>,
    listen_error: Option<TransportError>,
    fail_sends: bool,
    session: Arc<Mutex<Option<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message delivered on the next `listen`
    pub fn with_inbound(self, message: InboundMessage) -> Self {
        self.inbound.lock().unwrap().push_back(message);
        self
    }

    /// Fail the first `n` connect attempts
    pub fn failing_connects(self, n: u32) -> Self {
        *self.connect_failures.lock().unwrap() = n;
        self
    }

    /// Error returned by `listen` once the queue is drained
    pub fn with_listen_error(mut self, error: TransportError) -> Self {
        self.listen_error = Some(error);
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Get all recorded (recipient, text) sends
    pub fn get_sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connect_calls(&self) -> u32 {
        *self.connect_calls.lock().unwrap()
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self, saved_session: Option<String>) -> Result<String, TransportError> {
        *self.connect_calls.lock().unwrap() += 1;

        let mut failures = self.connect_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(TransportError::Connect("mock connect failure".to_string()));
        }

        let session = saved_session.unwrap_or_else(|| "mock-session".to_string());
        *self.session.lock().unwrap() = Some(session);
        Ok("mock-user".to_string())
    }

    fn session(&self) -> Option<String> {
        self.session.lock().unwrap().clone()
    }

    async fn listen(
        &self,
        _channel: &str,
        sink: mpsc::Sender<InboundMessage>,
    ) -> Result<(), TransportError> {
        loop {
            let next = self.inbound.lock().unwrap().pop_front();
            match next {
                Some(message) => {
                    // Session tracks the next unread message, like an update offset
                    *self.session.lock().unwrap() = Some((message.message_id + 1).to_string());
                    if sink.send(message).await.is_err() {
                        return Ok(());
                    }
                }
                None => break,
            }
        }

        match &self.listen_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Send {
                recipient: recipient.to_string(),
                reason: "mock send failure".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}
