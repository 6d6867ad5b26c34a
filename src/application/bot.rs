//! Signal Bot
//!
//! Owns the transport session: bounded login retry with session reuse,
//! the listener loop, and per-message dispatch. Each text message runs the
//! pipeline in its own task, so overlapping signals interleave freely.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::domain::session_store::SessionStore;
use crate::ports::transport::{InboundMessage, MessageTransport, TransportError};

use super::evolver::{EvolutionCadence, StrategyEvolver};
use super::pipeline::{SignalOutcome, SignalPipeline};

/// Buffered inbound messages between the listener and the dispatcher
const INBOUND_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Login failed after {attempts} attempts: {last_error}")]
    LoginExhausted {
        attempts: u32,
        #[source]
        last_error: TransportError,
    },
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Channel whose messages are treated as signals
    pub channel: String,
    pub max_login_attempts: u32,
    pub login_retry_delay: Duration,
}

impl BotSettings {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            max_login_attempts: 3,
            login_retry_delay: Duration::from_secs(5),
        }
    }

    pub fn with_login_retry(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.max_login_attempts = max_attempts.max(1);
        self.login_retry_delay = delay;
        self
    }
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// How one listening session ended
enum ListenEnd {
    /// Transport has nothing more to deliver
    Finished,
    Failed(TransportError),
    Stopped,
}

pub struct SignalBot {
    transport: Arc<dyn MessageTransport>,
    pipeline: SignalPipeline,
    session_store: SessionStore,
    settings: BotSettings,
    evolver: Option<StrategyEvolver>,
    cadence: EvolutionCadence,
    shutdown: watch::Sender<bool>,
}

impl SignalBot {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        pipeline: SignalPipeline,
        session_store: SessionStore,
        settings: BotSettings,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            pipeline,
            session_store,
            settings,
            evolver: None,
            cadence: EvolutionCadence::Manual,
            shutdown,
        }
    }

    /// Attach strategy evolution with the given cadence
    pub fn with_evolution(mut self, evolver: StrategyEvolver, cadence: EvolutionCadence) -> Self {
        self.evolver = Some(evolver);
        self.cadence = cadence;
        self
    }

    /// Ask `run` to stop listening; in-flight signals still complete
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    fn is_stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Log in, listen, and re-login whenever the listener fails
    ///
    /// Returns when the transport runs dry or `stop` is called. Only login
    /// retry exhaustion is an error.
    pub async fn run(&self) -> Result<(), BotError> {
        tracing::info!(
            "Starting signal bot on {} - channel: {}",
            self.transport.name(),
            self.settings.channel
        );

        let mut background: Vec<JoinHandle<()>> = Vec::new();
        let ticker = match (&self.evolver, self.cadence) {
            (Some(evolver), EvolutionCadence::Interval(period)) => {
                tracing::info!("Strategy evolution every {:?}", period);
                Some(evolver.spawn_interval(period))
            }
            _ => None,
        };

        let result = self.session_loop(&mut background).await;

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        for handle in background {
            handle.await.ok();
        }

        tracing::info!("Signal bot stopped");
        result
    }

    async fn session_loop(&self, background: &mut Vec<JoinHandle<()>>) -> Result<(), BotError> {
        while !self.is_stopping() {
            let identity = self.login().await?;
            tracing::info!("Listening for signals as {}", identity);

            if let (Some(evolver), EvolutionCadence::OnSessionStart) = (&self.evolver, self.cadence) {
                background.push(evolver.spawn());
            }

            match self.listen().await {
                ListenEnd::Finished => {
                    tracing::info!("Transport has no more messages");
                    break;
                }
                ListenEnd::Stopped => break,
                ListenEnd::Failed(e) => {
                    tracing::error!("Listener failed: {}; logging in again", e);
                    tokio::time::sleep(self.settings.login_retry_delay).await;
                }
            }
        }
        Ok(())
    }

    /// Bounded login retry, resuming from and then saving the session blob
    pub async fn login(&self) -> Result<String, BotError> {
        let max_attempts = self.settings.max_login_attempts.max(1);
        let mut last_error = TransportError::Closed;

        for attempt in 1..=max_attempts {
            let saved = self.session_store.load().unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable session file: {}", e);
                None
            });

            match self.transport.connect(saved).await {
                Ok(identity) => {
                    tracing::info!("Logged in to {} as {}", self.transport.name(), identity);
                    self.save_session(&mut None);
                    return Ok(identity);
                }
                Err(e) => {
                    tracing::error!("Login attempt {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = e;
                    if attempt < max_attempts {
                        tracing::info!("Retrying login in {:?}...", self.settings.login_retry_delay);
                        tokio::time::sleep(self.settings.login_retry_delay).await;
                    }
                }
            }
        }

        Err(BotError::LoginExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    async fn listen(&self) -> ListenEnd {
        let (tx, mut rx) = mpsc::channel(INBOUND_BUFFER);
        let transport = Arc::clone(&self.transport);
        let channel = self.settings.channel.clone();
        let listener = tokio::spawn(async move { transport.listen(&channel, tx).await });

        let mut stop = self.shutdown.subscribe();
        let mut in_flight = JoinSet::new();
        let mut stopped = false;
        let mut last_saved = self.transport.session();

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => {
                        self.save_session(&mut last_saved);
                        self.dispatch(message, &mut in_flight);
                    }
                    None => break,
                },
                _ = stop_requested(&mut stop) => {
                    tracing::info!("Shutdown requested, closing listener");
                    stopped = true;
                    break;
                }
            }
            while in_flight.try_join_next().is_some() {}
        }

        if stopped {
            listener.abort();
        }
        if !in_flight.is_empty() {
            tracing::info!("Waiting for {} in-flight signals", in_flight.len());
        }
        while in_flight.join_next().await.is_some() {}

        if stopped {
            return ListenEnd::Stopped;
        }
        let ended = listener.await;
        self.save_session(&mut last_saved);
        match ended {
            Ok(Ok(())) => ListenEnd::Finished,
            Ok(Err(e)) => ListenEnd::Failed(e),
            Err(e) => ListenEnd::Failed(TransportError::Receive(e.to_string())),
        }
    }

    /// Persist the transport session if it moved past `last_saved`
    fn save_session(&self, last_saved: &mut Option<String>) {
        let Some(session) = self.transport.session() else {
            return;
        };
        if last_saved.as_deref() == Some(session.as_str()) {
            return;
        }
        match self.session_store.save(&session) {
            Ok(()) => *last_saved = Some(session),
            Err(e) => tracing::warn!("Failed to save session: {}", e),
        }
    }

    fn dispatch(&self, message: InboundMessage, in_flight: &mut JoinSet<()>) {
        let Some(text) = message.text else {
            tracing::debug!("Skipping non-text message {} from {}", message.message_id, message.chat);
            return;
        };

        tracing::info!("Received message {} from {}", message.message_id, message.chat);
        let pipeline = self.pipeline.clone();
        in_flight.spawn(async move {
            match pipeline.handle(&text).await {
                Ok(SignalOutcome::Ignored) => {}
                Ok(SignalOutcome::Decided(outcome)) => {
                    tracing::debug!("Signal handled: {:?}", outcome);
                }
                Err(e) => tracing::error!("Signal analysis failed: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::registry::ProviderRegistry;
    use crate::application::decision::DecisionEngine;
    use crate::application::executor::TradeExecutor;
    use crate::application::orchestrator::AnalysisOrchestrator;
    use crate::domain::analysis_archive::AnalysisArchive;
    use crate::domain::trade_log::{TradeRecord, TradeRecorder};
    use crate::domain::token::TokenInfo;
    use crate::ports::completion::ProviderError;
    use crate::ports::mocks::{MockProvider, MockTransport};
    use crate::ports::transport::MockMessageTransport;
    use tempfile::TempDir;

    const SIGNAL: &str = "KOL Buy BONK!\n$BONK(Bonk)\nDezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn fast_settings() -> BotSettings {
        BotSettings::new("@kol_alerts").with_login_retry(3, Duration::from_millis(1))
    }

    fn build_bot(
        dir: &TempDir,
        transport: Arc<dyn MessageTransport>,
        provider: MockProvider,
    ) -> SignalBot {
        let registry = ProviderRegistry::new("deepseek").with_provider(Arc::new(provider));
        let orchestrator = AnalysisOrchestrator::new(registry, "中级", "0.01");
        let executor = TradeExecutor::new(
            Arc::clone(&transport),
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            "@US_GMGNBOT",
            "0.01",
        );
        let pipeline = SignalPipeline::new(orchestrator, DecisionEngine::new(executor));
        SignalBot::new(
            transport,
            pipeline,
            SessionStore::new(dir.path().join("session.json")),
            fast_settings(),
        )
    }

    #[tokio::test]
    async fn test_login_retries_then_succeeds() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().failing_connects(2);
        let bot = build_bot(&dir, Arc::new(transport.clone()), MockProvider::new("deepseek"));

        bot.run().await.unwrap();

        assert_eq!(transport.connect_calls(), 3);
        let saved = SessionStore::new(dir.path().join("session.json")).load().unwrap();
        assert_eq!(saved.as_deref(), Some("mock-session"));
    }

    #[tokio::test]
    async fn test_login_exhaustion_is_fatal() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().failing_connects(10);
        let bot = build_bot(&dir, Arc::new(transport.clone()), MockProvider::new("deepseek"));

        let err = bot.run().await.unwrap_err();

        assert!(matches!(err, BotError::LoginExhausted { attempts: 3, .. }));
        assert_eq!(transport.connect_calls(), 3);
    }

    #[tokio::test]
    async fn test_saved_session_is_offered_to_transport() {
        let dir = TempDir::new().unwrap();
        SessionStore::new(dir.path().join("session.json")).save("resume-me").unwrap();

        let mut transport = MockMessageTransport::new();
        transport.expect_name().return_const("mock".to_string());
        transport
            .expect_connect()
            .withf(|saved| saved.as_deref() == Some("resume-me"))
            .times(1)
            .returning(|_| Ok("alice".to_string()));
        transport.expect_session().returning(|| Some("resume-me".to_string()));
        transport.expect_listen().times(1).returning(|_, _| Ok(()));

        let bot = build_bot(&dir, Arc::new(transport), MockProvider::new("deepseek"));
        bot.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_signals_processed_and_others_skipped() {
        let dir = TempDir::new().unwrap();
        let mut media = InboundMessage::text("@kol_alerts", 3, "");
        media.text = None;
        let transport = MockTransport::new()
            .with_inbound(InboundMessage::text("@kol_alerts", 1, SIGNAL))
            .with_inbound(InboundMessage::text("@kol_alerts", 2, "just chatting"))
            .with_inbound(media);
        let provider = MockProvider::new("deepseek").with_fallback("报告结果：建议购买");
        let bot = build_bot(&dir, Arc::new(transport.clone()), provider.clone());

        bot.run().await.unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(
            transport.get_sent(),
            vec![(
                "@US_GMGNBOT".to_string(),
                "/buy DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263 0.01".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_failing_signal_does_not_stop_listener() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new()
            .with_inbound(InboundMessage::text("@kol_alerts", 1, SIGNAL))
            .with_inbound(InboundMessage::text("@kol_alerts", 2, SIGNAL));
        let provider = MockProvider::new("deepseek")
            .with_error(ProviderError::Network {
                provider: "deepseek".to_string(),
                reason: "timeout".to_string(),
            })
            .with_fallback("报告结果：建议购买");
        let bot = build_bot(&dir, Arc::new(transport.clone()), provider.clone());

        bot.run().await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(transport.get_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_listener_failure_triggers_relogin() {
        let dir = TempDir::new().unwrap();
        let mut transport = MockMessageTransport::new();
        transport.expect_name().return_const("mock".to_string());
        transport.expect_connect().times(2).returning(|_| Ok("alice".to_string()));
        transport.expect_session().returning(|| None);
        let mut listens = 0;
        transport.expect_listen().times(2).returning(move |_, _| {
            listens += 1;
            if listens == 1 {
                Err(TransportError::Receive("connection reset".to_string()))
            } else {
                Ok(())
            }
        });

        let bot = build_bot(&dir, Arc::new(transport), MockProvider::new("deepseek"));
        bot.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_ends_blocking_listener() {
        let dir = TempDir::new().unwrap();
        let mut transport = MockMessageTransport::new();
        transport.expect_name().return_const("mock".to_string());
        transport.expect_connect().returning(|_| Ok("alice".to_string()));
        transport.expect_session().returning(|| None);
        // Keep the sender alive so the dispatcher only exits on stop
        transport.expect_listen().returning(|_, sink| {
            std::mem::forget(sink);
            Ok(())
        });

        let bot = Arc::new(build_bot(&dir, Arc::new(transport), MockProvider::new("deepseek")));
        let runner = Arc::clone(&bot);
        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        bot.stop();

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn test_evolution_runs_on_session_start() {
        let dir = TempDir::new().unwrap();
        let mut token = TokenInfo::default();
        token.symbol = "OLD".to_string();
        TradeRecorder::in_dir(dir.path(), 100)
            .append(TradeRecord::new(&token, "0.01", "报告结果：建议购买"))
            .unwrap();

        let transport = MockTransport::new();
        let provider = MockProvider::new("deepseek").with_fallback("review");
        let evolver = StrategyEvolver::new(
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            AnalysisArchive::in_dir(dir.path()),
            ProviderRegistry::new("deepseek").with_provider(Arc::new(provider.clone())),
        );
        let bot = build_bot(&dir, Arc::new(transport), provider.clone())
            .with_evolution(evolver, EvolutionCadence::OnSessionStart);

        bot.run().await.unwrap();

        let latest = AnalysisArchive::in_dir(dir.path()).latest().unwrap().unwrap();
        assert_eq!(latest.analysis_result, "review");
        assert_eq!(latest.total_trades, 1);
    }

    #[tokio::test]
    async fn test_manual_cadence_never_evolves() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new("deepseek").with_fallback("review");
        let evolver = StrategyEvolver::new(
            Arc::new(TradeRecorder::in_dir(dir.path(), 100)),
            AnalysisArchive::in_dir(dir.path()),
            ProviderRegistry::new("deepseek").with_provider(Arc::new(provider.clone())),
        );
        let bot = build_bot(&dir, Arc::new(MockTransport::new()), provider.clone())
            .with_evolution(evolver, EvolutionCadence::Manual);

        bot.run().await.unwrap();

        assert_eq!(provider.call_count(), 0);
        assert!(AnalysisArchive::in_dir(dir.path()).latest().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_saved_as_messages_arrive() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new()
            .with_inbound(InboundMessage::text("@kol_alerts", 41, "gm"))
            .with_inbound(InboundMessage::text("@kol_alerts", 42, "still chatting"));
        let bot = build_bot(&dir, Arc::new(transport.clone()), MockProvider::new("deepseek"));

        bot.run().await.unwrap();

        // A restart resumes after the last delivered update
        let saved = SessionStore::new(dir.path().join("session.json")).load().unwrap();
        assert_eq!(saved.as_deref(), Some("43"));
        assert_eq!(transport.session().as_deref(), Some("43"));
    }
}
