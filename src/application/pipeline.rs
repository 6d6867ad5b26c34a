//! Signal Pipeline
//!
//! classify → extract → analyze → decide, for one inbound message.

use crate::domain::classifier::classify;
use crate::domain::extractor::extract;
use crate::ports::completion::ProviderError;

use super::decision::{DecisionEngine, DecisionOutcome};
use super::orchestrator::{AnalysisOptions, AnalysisOrchestrator};

#[derive(Debug)]
pub enum SignalOutcome {
    /// No known signal marker; nothing downstream ran
    Ignored,
    Decided(DecisionOutcome),
}

#[derive(Clone)]
pub struct SignalPipeline {
    orchestrator: AnalysisOrchestrator,
    decision: DecisionEngine,
    options: AnalysisOptions,
}

impl SignalPipeline {
    pub fn new(orchestrator: AnalysisOrchestrator, decision: DecisionEngine) -> Self {
        // The trade plan is sized to the amount the executor will actually send
        let options = AnalysisOptions::default()
            .with_buy_amount(decision.executor().buy_amount().to_string());
        Self {
            orchestrator,
            decision,
            options,
        }
    }

    /// Override which provider analyzes signals
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.options.provider = Some(provider.into());
        self
    }

    /// Process one message
    ///
    /// A provider failure only ends processing of this message; the caller
    /// logs it and keeps listening.
    pub async fn handle(&self, text: &str) -> Result<SignalOutcome, ProviderError> {
        let classification = classify(text);
        if !classification.signal_type.is_known() {
            tracing::debug!("Ignoring message without a known signal marker");
            return Ok(SignalOutcome::Ignored);
        }

        let token = extract(text, classification);
        tracing::info!(
            "Parsed {} signal on {}: {}",
            token.signal_type,
            token.chain,
            token.label()
        );

        let analysis = self.orchestrator.analyze(token, &self.options).await?;
        Ok(SignalOutcome::Decided(self.decision.decide(&analysis).await))
    }
}
