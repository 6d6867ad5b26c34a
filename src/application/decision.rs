//! Decision Engine
//!
//! Routes a verdict: buy signals go to the executor, everything else is
//! logged and dropped.

use crate::domain::analysis::AnalysisResult;
use crate::domain::trade_log::TradeRecord;

use super::executor::{TradeExecutionError, TradeExecutor};

#[derive(Debug)]
pub enum DecisionOutcome {
    /// Command dispatched and recorded
    Bought(TradeRecord),
    /// Verdict was not a buy
    Passed { reason: String },
    /// Verdict was a buy but the command could not be dispatched
    BuyFailed(TradeExecutionError),
}

impl DecisionOutcome {
    pub fn is_bought(&self) -> bool {
        matches!(self, DecisionOutcome::Bought(_))
    }
}

#[derive(Clone)]
pub struct DecisionEngine {
    executor: TradeExecutor,
}

impl DecisionEngine {
    pub fn new(executor: TradeExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &TradeExecutor {
        &self.executor
    }

    pub async fn decide(&self, analysis: &AnalysisResult) -> DecisionOutcome {
        if !analysis.should_buy {
            tracing::info!(
                "AI verdict: pass on {} - {}",
                analysis.token_info.label(),
                analysis.reason
            );
            return DecisionOutcome::Passed {
                reason: analysis.reason.clone(),
            };
        }

        tracing::info!(
            "AI verdict: buy {} - {}",
            analysis.token_info.label(),
            analysis.reason
        );

        match self
            .executor
            .execute(&analysis.token_info, &analysis.full_analysis)
            .await
        {
            Ok(record) => DecisionOutcome::Bought(record),
            Err(e) => DecisionOutcome::BuyFailed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::TokenInfo;
    use crate::domain::trade_log::TradeRecorder;
    use crate::ports::mocks::MockTransport;
    use crate::ports::transport::MockMessageTransport;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn analysis(report: &str) -> AnalysisResult {
        let mut token = TokenInfo::default();
        token.symbol = "WIF".to_string();
        token.address = "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm".to_string();
        AnalysisResult::from_response(report.to_string(), token)
    }

    #[tokio::test]
    async fn test_pass_never_touches_transport() {
        let dir = TempDir::new().unwrap();
        let mut transport = MockMessageTransport::new();
        transport.expect_send_text().never();
        let executor = TradeExecutor::new(
            Arc::new(transport),
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            "@bot",
            "0.01",
        );

        let outcome = DecisionEngine::new(executor)
            .decide(&analysis("报告结果：建议放弃，流动性低"))
            .await;

        assert!(matches!(outcome, DecisionOutcome::Passed { reason } if reason.contains("建议放弃")));
    }

    #[tokio::test]
    async fn test_buy_dispatches_full_analysis() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new();
        let executor = TradeExecutor::new(
            Arc::new(transport.clone()),
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            "@bot",
            "0.01",
        );
        let report = format!("报告结果：建议购买\n{}", "详细分析".repeat(100));

        let outcome = DecisionEngine::new(executor).decide(&analysis(&report)).await;

        match outcome {
            DecisionOutcome::Bought(record) => assert_eq!(record.analysis_result, report),
            other => panic!("expected Bought, got {:?}", other),
        }
        assert_eq!(transport.get_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_is_buy_failed() {
        let dir = TempDir::new().unwrap();
        let executor = TradeExecutor::new(
            Arc::new(MockTransport::new().failing_sends()),
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            "@bot",
            "0.01",
        );

        let outcome = DecisionEngine::new(executor)
            .decide(&analysis("报告结果：建议购买"))
            .await;

        assert!(matches!(outcome, DecisionOutcome::BuyFailed(_)));
        assert!(!outcome.is_bought());
    }
}
