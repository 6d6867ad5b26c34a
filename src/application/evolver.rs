//! Strategy Evolver
//!
//! Mines the trade log for heuristic features, asks a provider for an
//! advisory review and archives the narrative. Nothing here changes any
//! trading parameter.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::ports::registry::ProviderRegistry;
use crate::domain::analysis_archive::{AnalysisArchive, StrategyAnalysis};
use crate::domain::feature_rules::{derive_all, StrategyFeatureRecord, RULESET_VERSION};
use crate::domain::json_file::PersistError;
use crate::domain::trade_log::TradeRecorder;
use crate::ports::completion::ProviderError;

/// System prompt for the meta-analysis
pub const META_SYSTEM_PROMPT: &str =
    "你是一个专业的加密货币数据分析师，擅长从历史数据中总结经验并提供具体的改进建议。";

/// When evolution runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionCadence {
    /// After every successful transport login
    OnSessionStart,
    /// On a fixed period while the bot runs
    Interval(Duration),
    /// Only through the `evolve` command
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvolutionOutcome {
    /// Empty trade log; no provider call was made
    NoData,
    Completed { total_trades: usize, narrative: String },
}

#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("Trade history unavailable: {0}")]
    Persist(#[from] PersistError),

    #[error("Meta-analysis failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to encode features: {0}")]
    Serialization(String),

    #[error("Archive task failed: {0}")]
    Task(String),
}

/// Meta-analysis prompt over the derived feature list
pub fn build_meta_prompt(features: &[StrategyFeatureRecord]) -> Result<String, EvolutionError> {
    let json = serde_json::to_string(features)
        .map_err(|e| EvolutionError::Serialization(e.to_string()))?;

    Ok(format!(
        "请分析以下历史交易数据，找出决策模式和改进方向：
{json}

请提供以下分析：
1. 失败交易的3个主要原因
2. 成功交易的3个关键特征
3. 改进交易策略的3个建议
4. 是否存在可能错过的潜在机会（例如，拒绝了但市场表现良好的代币）
5. 如何调整决策阈值以提高成功率"
    ))
}

#[derive(Clone)]
pub struct StrategyEvolver {
    recorder: Arc<TradeRecorder>,
    archive: AnalysisArchive,
    registry: ProviderRegistry,
    provider: Option<String>,
}

impl StrategyEvolver {
    pub fn new(recorder: Arc<TradeRecorder>, archive: AnalysisArchive, registry: ProviderRegistry) -> Self {
        Self {
            recorder,
            archive,
            registry,
            provider: None,
        }
    }

    /// Use a specific provider instead of the registry default
    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn archive(&self) -> &AnalysisArchive {
        &self.archive
    }

    /// Run one evolution pass
    pub async fn evolve(&self) -> Result<EvolutionOutcome, EvolutionError> {
        tracing::info!("Starting strategy evolution analysis (ruleset v{})", RULESET_VERSION);

        let trades = self.recorder.load_all()?;
        if trades.is_empty() {
            tracing::info!("No trade history to analyze");
            return Ok(EvolutionOutcome::NoData);
        }

        let features = derive_all(&trades);
        let prompt = build_meta_prompt(&features)?;

        let provider = self.registry.resolve(self.provider.as_deref())?;
        tracing::info!("Requesting meta-analysis of {} trades from {}", trades.len(), provider.name());
        let narrative = provider.complete(META_SYSTEM_PROMPT, &prompt).await?;

        let entry = StrategyAnalysis {
            timestamp: Utc::now(),
            total_trades: trades.len(),
            analysis_result: narrative.clone(),
            ruleset_version: RULESET_VERSION.to_string(),
        };
        let archive = self.archive.clone();
        tokio::task::spawn_blocking(move || archive.store(&entry))
            .await
            .map_err(|e| EvolutionError::Task(e.to_string()))??;

        tracing::info!("Strategy analysis complete");
        Ok(EvolutionOutcome::Completed {
            total_trades: trades.len(),
            narrative,
        })
    }

    /// Evolve in the background, logging the result
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let evolver = self.clone();
        tokio::spawn(async move {
            if let Err(e) = evolver.evolve().await {
                tracing::error!("Strategy evolution failed: {}", e);
            }
        })
    }

    /// Evolve every `period` until the task is aborted
    pub fn spawn_interval(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let evolver = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = evolver.evolve().await {
                    tracing::error!("Strategy evolution failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::TokenInfo;
    use crate::domain::trade_log::TradeRecord;
    use crate::ports::completion::MockCompletionProvider;
    use crate::ports::mocks::MockProvider;
    use tempfile::TempDir;

    fn evolver_with(dir: &TempDir, provider: Arc<dyn crate::ports::completion::CompletionProvider>) -> StrategyEvolver {
        let registry = ProviderRegistry::new("deepseek").with_provider(provider);
        StrategyEvolver::new(
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            AnalysisArchive::in_dir(dir.path()),
            registry,
        )
    }

    fn seed_trade(dir: &TempDir, symbol: &str, analysis: &str) {
        let mut token = TokenInfo::default();
        token.symbol = symbol.to_string();
        token.address = format!("{}Address", symbol);
        TradeRecorder::in_dir(dir.path(), 100)
            .append(TradeRecord::new(&token, "0.01", analysis))
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_store_makes_no_provider_call() {
        let dir = TempDir::new().unwrap();
        let mut provider = MockCompletionProvider::new();
        provider.expect_name().return_const("deepseek".to_string());
        provider.expect_complete().never();

        let outcome = evolver_with(&dir, Arc::new(provider)).evolve().await.unwrap();

        assert_eq!(outcome, EvolutionOutcome::NoData);
        assert!(!dir.path().join("trade_analysis.json").exists());
    }

    #[tokio::test]
    async fn test_completed_run_archives_narrative() {
        let dir = TempDir::new().unwrap();
        seed_trade(&dir, "BONK", "报告结果：建议购买\n风险评估：7\n社区情绪积极");
        seed_trade(&dir, "WIF", "报告结果：建议购买\n流动性低");
        let provider = MockProvider::new("deepseek").with_response("1. 失败原因：追高");
        let evolver = evolver_with(&dir, Arc::new(provider.clone()));

        let outcome = evolver.evolve().await.unwrap();

        assert_eq!(
            outcome,
            EvolutionOutcome::Completed {
                total_trades: 2,
                narrative: "1. 失败原因：追高".to_string()
            }
        );

        let (system, user) = provider.get_calls().remove(0);
        assert_eq!(system, META_SYSTEM_PROMPT);
        assert!(user.contains("\"tokenSymbol\":\"BONK\""));
        assert!(user.contains("\"riskLevel\":\"7\""));
        assert!(user.contains("5. 如何调整决策阈值以提高成功率"));

        let latest = evolver.archive().latest().unwrap().unwrap();
        assert_eq!(latest.total_trades, 2);
        assert_eq!(latest.ruleset_version, RULESET_VERSION);
        assert_eq!(evolver.archive().history().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_grows_latest_is_replaced() {
        let dir = TempDir::new().unwrap();
        seed_trade(&dir, "BONK", "报告结果：建议购买");
        let provider = MockProvider::new("deepseek")
            .with_response("first review")
            .with_response("second review");
        let evolver = evolver_with(&dir, Arc::new(provider));

        evolver.evolve().await.unwrap();
        evolver.evolve().await.unwrap();

        assert_eq!(evolver.archive().history().unwrap().len(), 2);
        assert_eq!(evolver.archive().latest().unwrap().unwrap().analysis_result, "second review");
    }

    #[tokio::test]
    async fn test_provider_failure_archives_nothing() {
        let dir = TempDir::new().unwrap();
        seed_trade(&dir, "BONK", "报告结果：建议购买");
        let provider = MockProvider::new("deepseek").with_error(ProviderError::Configuration(
            "API key for provider 'deepseek' is not configured".to_string(),
        ));
        let evolver = evolver_with(&dir, Arc::new(provider));

        let err = evolver.evolve().await.unwrap_err();

        assert!(matches!(err, EvolutionError::Provider(ProviderError::Configuration(_))));
        assert!(evolver.archive().history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_named_provider_is_used() {
        let dir = TempDir::new().unwrap();
        seed_trade(&dir, "BONK", "报告结果：建议购买");
        let deepseek = MockProvider::new("deepseek");
        let openai = MockProvider::new("openai").with_response("review");
        let registry = ProviderRegistry::new("deepseek")
            .with_provider(Arc::new(deepseek.clone()))
            .with_provider(Arc::new(openai.clone()));
        let evolver = StrategyEvolver::new(
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            AnalysisArchive::in_dir(dir.path()),
            registry,
        )
        .with_provider(Some("openai".to_string()));

        evolver.evolve().await.unwrap();

        assert_eq!(deepseek.call_count(), 0);
        assert_eq!(openai.call_count(), 1);
    }
}
