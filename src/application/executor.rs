//! Trade Executor
//!
//! Sends `/buy <address> <amount>` to the trading bot account and records
//! the dispatch. There is no fill confirmation: a record means the command
//! went out.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::token::TokenInfo;
use crate::domain::trade_log::{TradeRecord, TradeRecorder};
use crate::ports::transport::{MessageTransport, TransportError};

#[derive(Debug, Error)]
pub enum TradeExecutionError {
    #[error("Token {0} has no contract address")]
    MissingAddress(String),

    #[error("Failed to send buy command: {0}")]
    Transport(#[from] TransportError),
}

/// Trade command understood by the trading bot
pub fn buy_command(address: &str, amount: &str) -> String {
    format!("/buy {} {}", address, amount)
}

#[derive(Clone)]
pub struct TradeExecutor {
    transport: Arc<dyn MessageTransport>,
    recorder: Arc<TradeRecorder>,
    recipient: String,
    buy_amount: String,
}

impl TradeExecutor {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        recorder: Arc<TradeRecorder>,
        recipient: impl Into<String>,
        buy_amount: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            recorder,
            recipient: recipient.into(),
            buy_amount: buy_amount.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn buy_amount(&self) -> &str {
        &self.buy_amount
    }

    /// Dispatch a buy for `token` and record it
    ///
    /// A send failure is returned without recording. A record that cannot be
    /// persisted after a successful send is logged and the dispatch still
    /// counts.
    pub async fn execute(
        &self,
        token: &TokenInfo,
        analysis: &str,
    ) -> Result<TradeRecord, TradeExecutionError> {
        if token.address.is_empty() {
            tracing::error!("Refusing to buy {}: no contract address extracted", token.label());
            return Err(TradeExecutionError::MissingAddress(token.symbol.clone()));
        }

        let command = buy_command(&token.address, &self.buy_amount);
        tracing::info!("Sending buy command: {}", command);

        if let Err(e) = self.transport.send_text(&self.recipient, &command).await {
            tracing::error!("Buy command to {} failed: {}", self.recipient, e);
            return Err(e.into());
        }
        tracing::info!("Buy command sent to {}", self.recipient);

        let record = TradeRecord::new(token, &self.buy_amount, analysis);
        let recorder = Arc::clone(&self.recorder);
        let stored = record.clone();
        // File I/O under the recorder lock stays off the async workers
        match tokio::task::spawn_blocking(move || recorder.append(stored)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!("Buy command sent but trade record not saved: {}", e),
            Err(e) => tracing::error!("Trade record task failed: {}", e),
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::transport::MockMessageTransport;
    use crate::ports::mocks::MockTransport;
    use tempfile::TempDir;

    fn token() -> TokenInfo {
        let mut token = TokenInfo::default();
        token.symbol = "PEPE".to_string();
        token.name = "Pepe Coin".to_string();
        token.address = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr".to_string();
        token.raw_message = "KOL Buy PEPE!".to_string();
        token
    }

    fn recorder(dir: &TempDir) -> Arc<TradeRecorder> {
        Arc::new(TradeRecorder::in_dir(dir.path(), 100))
    }

    #[test]
    fn test_buy_command_format() {
        assert_eq!(buy_command("Addr123", "0.01"), "/buy Addr123 0.01");
    }

    #[tokio::test]
    async fn test_successful_send_is_recorded() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        let recorder = recorder(&dir);
        let executor = TradeExecutor::new(
            Arc::new(transport.clone()),
            Arc::clone(&recorder),
            "@US_GMGNBOT",
            "0.01",
        );

        let record = executor.execute(&token(), "报告结果：建议购买").await.unwrap();

        assert_eq!(
            transport.get_sent(),
            vec![(
                "@US_GMGNBOT".to_string(),
                "/buy 7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr 0.01".to_string()
            )]
        );
        assert_eq!(record.buy_amount, "0.01");
        assert_eq!(record.old_message, "KOL Buy PEPE!");
        let stored = recorder.load_all().unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[tokio::test]
    async fn test_send_failure_records_nothing() {
        let dir = TempDir::new().unwrap();
        let mut transport = MockMessageTransport::new();
        transport.expect_send_text().times(1).returning(|recipient, _| {
            Err(TransportError::Send {
                recipient: recipient.to_string(),
                reason: "FLOOD_WAIT".to_string(),
            })
        });
        let recorder = recorder(&dir);
        let executor = TradeExecutor::new(Arc::new(transport), Arc::clone(&recorder), "@bot", "0.01");

        let result = executor.execute(&token(), "报告结果：建议购买").await;

        assert!(matches!(result, Err(TradeExecutionError::Transport(_))));
        assert!(recorder.load_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_address_sends_nothing() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        let executor = TradeExecutor::new(Arc::new(transport.clone()), recorder(&dir), "@bot", "0.01");

        let mut token = token();
        token.address.clear();
        let result = executor.execute(&token, "报告结果：建议购买").await;

        assert!(matches!(result, Err(TradeExecutionError::MissingAddress(_))));
        assert!(transport.get_sent().is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_still_counts_as_dispatch() {
        let dir = TempDir::new().unwrap();
        // A directory where the trade file should be makes the write fail
        let blocked = dir.path().join("trades.json");
        std::fs::create_dir_all(blocked.join("nested")).unwrap();
        let transport = MockTransport::new();
        let executor = TradeExecutor::new(
            Arc::new(transport.clone()),
            Arc::new(TradeRecorder::new(blocked, 100)),
            "@bot",
            "0.01",
        );

        let result = executor.execute(&token(), "报告结果：建议购买").await;

        assert!(result.is_ok());
        assert_eq!(transport.get_sent().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_dispatches_all_recorded() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        let recorder = recorder(&dir);
        let executor = TradeExecutor::new(
            Arc::new(transport.clone()),
            Arc::clone(&recorder),
            "@US_GMGNBOT",
            "0.01",
        );

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let executor = executor.clone();
                tokio::spawn(async move {
                    let mut token = token();
                    token.address = format!("Address{n}");
                    executor.execute(&token, "报告结果：建议购买").await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(transport.get_sent().len(), 8);
        let stored = recorder.load_all().unwrap();
        assert_eq!(stored.len(), 8);
        for n in 0..8 {
            assert!(stored.iter().any(|r| r.token_address == format!("Address{n}")));
        }
    }
}
