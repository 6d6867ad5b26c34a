//! Signal Bot Integration Tests
//!
//! End-to-end flows across the layers:
//! 1. Inbound alert -> provider verdict -> /buy dispatch -> trade history
//! 2. Trade history -> strategy evolution -> analysis archive
//! 3. Paper mode replay through the real bot loop
//!
//! All tests are deterministic (no real network calls) and use scripted ports.

use std::sync::Arc;
use std::time::Duration;

use signal_bot::adapters::replay::ReplayTransport;
use signal_bot::application::{
    AnalysisOrchestrator, BotSettings, DecisionEngine, EvolutionCadence, EvolutionOutcome,
    SignalBot, SignalPipeline, StrategyEvolver, TradeExecutor,
};
use signal_bot::domain::analysis_archive::AnalysisArchive;
use signal_bot::domain::session_store::SessionStore;
use signal_bot::domain::trade_log::TradeRecorder;
use signal_bot::ports::mocks::{MockProvider, MockTransport};
use signal_bot::ports::registry::ProviderRegistry;
use signal_bot::ports::transport::{InboundMessage, MessageTransport};
use tempfile::TempDir;

// ============================================================================
// Test Fixtures
// ============================================================================

const BONK_ADDRESS: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCaX3pEm3sXzwrZtbyy";
const WIF_ADDRESS: &str = "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm";

fn kol_buy(symbol: &str, address: &str) -> String {
    [
        format!("🔥🔥 KOL Buy {}!", symbol),
        format!("${}({} Token)", symbol, symbol),
        address.to_string(),
        "🟢 KOL Inflow净流入:$12.3K(54.1 Sol)".to_string(),
        "💡 MCP: $1.2M".to_string(),
        "💧 Liq: 253.08 SOL ($74.3K 🔥100%)".to_string(),
        "✅TOP 10: 13.47%".to_string(),
    ]
    .join("\n")
}

const BUY_REPORT: &str = "报告结果：建议购买\n社区情绪积极，流动性充足。\n止盈：+50%\n止损：-20%";
const PASS_REPORT: &str = "报告结果：建议放弃\n社区反应不佳，持币集中。";

struct Harness {
    _dir: TempDir,
    data_dir: std::path::PathBuf,
    recorder: Arc<TradeRecorder>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("logs");
        let recorder = Arc::new(TradeRecorder::in_dir(&data_dir, 100));
        Self { _dir: dir, data_dir, recorder }
    }

    fn pipeline(&self, provider: MockProvider, transport: Arc<dyn MessageTransport>) -> SignalPipeline {
        self.pipeline_recording_to(provider, transport, Arc::clone(&self.recorder))
    }

    fn pipeline_recording_to(
        &self,
        provider: MockProvider,
        transport: Arc<dyn MessageTransport>,
        recorder: Arc<TradeRecorder>,
    ) -> SignalPipeline {
        let registry = ProviderRegistry::new("deepseek").with_provider(Arc::new(provider));
        let orchestrator = AnalysisOrchestrator::new(registry, "中级", "0.01");
        let executor = TradeExecutor::new(transport, recorder, "@US_GMGNBOT", "0.01");
        SignalPipeline::new(orchestrator, DecisionEngine::new(executor))
    }

    fn bot(&self, transport: Arc<dyn MessageTransport>, pipeline: SignalPipeline) -> SignalBot {
        SignalBot::new(
            transport,
            pipeline,
            SessionStore::new(self.data_dir.join("session.json")),
            BotSettings::new("@kol_alerts").with_login_retry(2, Duration::from_millis(10)),
        )
    }
}

// ============================================================================
// Signal -> Trade
// ============================================================================

#[tokio::test]
async fn test_buy_verdict_dispatches_and_records() {
    let harness = Harness::new();
    let transport = Arc::new(
        MockTransport::new()
            .with_inbound(InboundMessage::text("@kol_alerts", 1, kol_buy("BONK", BONK_ADDRESS)))
            .with_inbound(InboundMessage::text("@kol_alerts", 2, "gm, no alert here"))
            .with_inbound(InboundMessage::text("@kol_alerts", 3, kol_buy("WIF", WIF_ADDRESS))),
    );
    let provider = MockProvider::new("deepseek")
        .with_response(BUY_REPORT)
        .with_response(PASS_REPORT);

    let pipeline = harness.pipeline(provider.clone(), transport.clone());
    harness.bot(transport.clone(), pipeline).run().await.unwrap();

    // The chatter message never reaches the provider
    assert_eq!(provider.call_count(), 2);

    let sent = transport.get_sent();
    let buys: Vec<_> = sent.iter().filter(|(_, text)| text.starts_with("/buy")).collect();
    assert_eq!(buys.len(), 1);
    assert_eq!(buys[0].0, "@US_GMGNBOT");
    assert!(buys[0].1 == format!("/buy {} 0.01", BONK_ADDRESS) || buys[0].1 == format!("/buy {} 0.01", WIF_ADDRESS));

    let trades = harness.recorder.load_all().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].buy_amount, "0.01");
    assert!(trades[0].analysis_result.contains("建议购买"));
    assert!(trades[0].trading_result.is_none());
}

#[tokio::test]
async fn test_session_saved_after_login() {
    let harness = Harness::new();
    let transport = Arc::new(MockTransport::new());
    let pipeline = harness.pipeline(MockProvider::new("deepseek"), transport.clone());

    harness.bot(transport.clone(), pipeline).run().await.unwrap();

    let saved = SessionStore::new(harness.data_dir.join("session.json")).load().unwrap();
    assert_eq!(saved.as_deref(), Some("mock-session"));
}

#[tokio::test]
async fn test_provider_failure_sends_nothing() {
    let harness = Harness::new();
    let transport = Arc::new(
        MockTransport::new()
            .with_inbound(InboundMessage::text("@kol_alerts", 1, kol_buy("BONK", BONK_ADDRESS))),
    );
    // No scripted reply: every completion fails
    let pipeline = harness.pipeline(MockProvider::new("deepseek"), transport.clone());

    harness.bot(transport.clone(), pipeline).run().await.unwrap();

    assert!(transport.get_sent().is_empty());
    assert!(harness.recorder.load_all().unwrap().is_empty());
}

// ============================================================================
// Trade History -> Evolution
// ============================================================================

#[tokio::test]
async fn test_evolution_over_recorded_trades() {
    let harness = Harness::new();
    let transport = Arc::new(
        MockTransport::new()
            .with_inbound(InboundMessage::text("@kol_alerts", 1, kol_buy("BONK", BONK_ADDRESS))),
    );
    let pipeline = harness.pipeline(MockProvider::new("deepseek").with_fallback(BUY_REPORT), transport.clone());
    harness.bot(transport, pipeline).run().await.unwrap();

    let meta = MockProvider::new("deepseek").with_response("1. 成功交易的共同特征: 流动性充足");
    let evolver = StrategyEvolver::new(
        Arc::clone(&harness.recorder),
        AnalysisArchive::in_dir(&harness.data_dir),
        ProviderRegistry::new("deepseek").with_provider(Arc::new(meta.clone())),
    );

    match evolver.evolve().await.unwrap() {
        EvolutionOutcome::Completed { total_trades, narrative } => {
            assert_eq!(total_trades, 1);
            assert!(narrative.contains("流动性充足"));
        }
        other => panic!("Expected completed evolution, got {:?}", other),
    }

    // Meta prompt carries the derived features of the recorded trade
    let (_, prompt) = &meta.get_calls()[0];
    assert!(prompt.contains(BONK_ADDRESS));

    let latest = evolver.archive().latest().unwrap().unwrap();
    assert_eq!(latest.total_trades, 1);
    assert_eq!(evolver.archive().history().unwrap().len(), 1);
}

#[tokio::test]
async fn test_evolution_on_session_start() {
    let harness = Harness::new();
    // Seed history so the session-start pass has data
    harness
        .recorder
        .append(signal_bot::domain::trade_log::TradeRecord {
            timestamp: chrono::Utc::now(),
            token_address: BONK_ADDRESS.to_string(),
            token_name: "Bonk".to_string(),
            token_symbol: "BONK".to_string(),
            buy_amount: "0.01".to_string(),
            old_message: kol_buy("BONK", BONK_ADDRESS),
            analysis_result: BUY_REPORT.to_string(),
            trading_result: None,
        })
        .unwrap();

    let transport = Arc::new(MockTransport::new());
    let registry = ProviderRegistry::new("deepseek")
        .with_provider(Arc::new(MockProvider::new("deepseek").with_fallback("复盘完成")));
    let evolver = StrategyEvolver::new(
        Arc::clone(&harness.recorder),
        AnalysisArchive::in_dir(&harness.data_dir),
        registry,
    );
    let pipeline = harness.pipeline(MockProvider::new("deepseek"), transport.clone());

    harness
        .bot(transport, pipeline)
        .with_evolution(evolver.clone(), EvolutionCadence::OnSessionStart)
        .run()
        .await
        .unwrap();

    let latest = evolver.archive().latest().unwrap().unwrap();
    assert_eq!(latest.analysis_result, "复盘完成");
}

// ============================================================================
// Paper Mode
// ============================================================================

#[tokio::test]
async fn test_replay_logs_commands_instead_of_sending() {
    let harness = Harness::new();
    let replay = Arc::new(ReplayTransport::new(vec![
        kol_buy("BONK", BONK_ADDRESS),
        "ATH Price Alert on Solana\n$WIF(dogwifhat)\nno address here".to_string(),
    ]));
    let provider = MockProvider::new("deepseek").with_fallback(BUY_REPORT);

    let paper = Arc::new(TradeRecorder::in_dir(&harness.data_dir.join("paper"), 100));

    let pipeline = harness.pipeline_recording_to(provider.clone(), replay.clone(), Arc::clone(&paper));
    harness.bot(replay.clone(), pipeline).run().await.unwrap();

    // Both signals analyzed; only the one with an address becomes a command
    assert_eq!(provider.call_count(), 2);
    assert_eq!(
        replay.sent(),
        vec![("@US_GMGNBOT".to_string(), format!("/buy {} 0.01", BONK_ADDRESS))]
    );
    assert_eq!(paper.load_all().unwrap().len(), 1);
    assert!(harness.recorder.load_all().unwrap().is_empty());
}
