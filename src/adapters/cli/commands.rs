//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the signal bot.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ports::registry::ProviderRegistry;
use crate::adapters::replay::ReplayTransport;
use crate::adapters::telegram::{TelegramConfig, TelegramTransport};
use crate::application::{
    AnalysisOptions, AnalysisOrchestrator, BotSettings, DecisionEngine, EvolutionOutcome,
    SignalBot, SignalPipeline, StrategyEvolver, TradeExecutor,
};
use crate::config::{Config, ConfigError};
use crate::domain::analysis_archive::AnalysisArchive;
use crate::domain::extractor::parse_message;
use crate::domain::json_file::write_json;
use crate::domain::session_store::SessionStore;
use crate::domain::trade_log::TradeRecorder;
use crate::ports::transport::MessageTransport;

/// File the provider probe writes its result to
pub const PROBE_RESULT_FILE: &str = "provider_probe_result.json";
const PROBE_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const PROBE_GREETING: &str = "你好";

/// Signal Bot - AI verdicts on KOL/ATH alerts with automatic /buy dispatch
#[derive(Parser, Debug)]
#[command(
    name = "signal-bot",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "AI trading-signal bot for Telegram alert channels",
    long_about = "Signal Bot parses KOL Buy / ATH Price alerts from a monitored channel, \
                  asks an LLM provider for a buy verdict and trade plan, and sends /buy \
                  commands to a trading bot when the verdict is positive."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = "config/bot.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for signals and trade on buy verdicts
    Run(RunCmd),

    /// Classify and extract a signal file, printing the token JSON
    Parse(ParseCmd),

    /// Ask the provider for a verdict on a signal file (no trade)
    Analyze(AnalyzeCmd),

    /// Run the strategy evolution analysis once
    Evolve(EvolveCmd),

    /// Check that a provider answers
    Probe(ProbeCmd),
}

/// Start the bot
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Paper mode: replay signals from a file and log commands instead of sending
    #[arg(short, long, requires = "replay")]
    pub paper: bool,

    /// Signal file for paper mode (signals separated by `---` lines)
    #[arg(long, value_name = "FILE", requires = "paper")]
    pub replay: Option<PathBuf>,
}

/// Parse a signal
#[derive(Parser, Debug)]
pub struct ParseCmd {
    /// File holding one raw signal message
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Analyze a signal
#[derive(Parser, Debug)]
pub struct AnalyzeCmd {
    /// File holding one raw signal message
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Provider name (default: [ai].default_provider)
    #[arg(long, value_name = "NAME")]
    pub provider: Option<String>,

    /// SOL amount the trade plan is sized to (default: [trading].default_buy_amount)
    #[arg(long, value_name = "AMOUNT")]
    pub buy_amount: Option<String>,
}

/// Run strategy evolution
#[derive(Parser, Debug)]
pub struct EvolveCmd {
    /// Provider name (default: [evolution].provider, then [ai].default_provider)
    #[arg(long, value_name = "NAME")]
    pub provider: Option<String>,
}

/// Probe a provider
#[derive(Parser, Debug)]
pub struct ProbeCmd {
    /// Provider name (default: [ai].default_provider)
    #[arg(long, value_name = "NAME")]
    pub provider: Option<String>,
}

/// Outcome of a provider probe, as saved to disk
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub provider: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Execute the CLI command
///
/// `parse` works without a usable config; every other command needs one.
pub async fn execute(app: CliApp, config: Result<Config, ConfigError>) -> Result<()> {
    if let Command::Parse(cmd) = &app.command {
        return parse_command(cmd);
    }

    let config = config
        .with_context(|| format!("Failed to load configuration from {}", app.config.display()))?;

    match app.command {
        Command::Run(cmd) => run_command(cmd, &config).await,
        Command::Parse(_) => Ok(()),
        Command::Analyze(cmd) => analyze_command(cmd, &config).await,
        Command::Evolve(cmd) => evolve_command(cmd, &config).await,
        Command::Probe(cmd) => probe_command(cmd, &config).await,
    }
}

fn build_registry(config: &Config) -> Result<ProviderRegistry> {
    ProviderRegistry::from_settings(config.ai.default_provider.clone(), config.provider_settings())
        .context("Failed to build AI providers")
}

fn build_evolver(
    config: &Config,
    data_dir: &Path,
    registry: ProviderRegistry,
    provider: Option<String>,
) -> StrategyEvolver {
    StrategyEvolver::new(
        Arc::new(TradeRecorder::in_dir(data_dir, config.storage.trade_capacity)),
        AnalysisArchive::in_dir(data_dir),
        registry,
    )
    .with_provider(provider.or_else(|| config.evolution.provider.clone()))
}

fn read_signal(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read signal file {}", path.display()))
}

async fn run_command(cmd: RunCmd, config: &Config) -> Result<()> {
    tracing::info!("Starting signal bot...");

    let registry = build_registry(config)?;
    // Paper trades never land in the live history the evolver learns from
    let data_dir = config.storage.data_path_for(cmd.paper);
    let recorder = Arc::new(TradeRecorder::in_dir(&data_dir, config.storage.trade_capacity));

    let mut replay: Option<Arc<ReplayTransport>> = None;
    let (transport, channel): (Arc<dyn MessageTransport>, String) = if cmd.paper {
        let Some(path) = cmd.replay.as_deref() else {
            bail!("--paper requires --replay FILE");
        };
        tracing::warn!("PAPER TRADING MODE - commands are logged, not sent");
        let transport = Arc::new(ReplayTransport::from_file(path)?);
        replay = Some(Arc::clone(&transport));
        (transport as Arc<dyn MessageTransport>, "replay".to_string())
    } else {
        config.validate_bot_api_recipient()?;
        let bot_token = config.telegram.get_bot_token().with_context(|| {
            format!(
                "Telegram bot token is not set: export {} or set [telegram].bot_token",
                config.telegram.bot_token_env
            )
        })?;
        let channel = config.telegram.get_monitor_channel().context(
            "Monitored channel is not set: export TELEGRAM_MONITOR_CHANNEL or set [telegram].monitor_channel",
        )?;
        let transport = TelegramTransport::new(TelegramConfig {
            api_base_url: config.telegram.api_base_url.clone(),
            bot_token: Some(bot_token),
            poll_timeout: std::time::Duration::from_secs(config.telegram.poll_timeout_secs),
        })?;
        (Arc::new(transport) as Arc<dyn MessageTransport>, channel)
    };

    let orchestrator = AnalysisOrchestrator::new(
        registry.clone(),
        config.ai.risk_tolerance.clone(),
        config.trading.default_buy_amount.clone(),
    );
    let executor = TradeExecutor::new(
        Arc::clone(&transport),
        Arc::clone(&recorder),
        config.trading.recipient.clone(),
        config.trading.default_buy_amount.clone(),
    );
    let pipeline = SignalPipeline::new(orchestrator, DecisionEngine::new(executor));
    let evolver = build_evolver(config, &data_dir, registry, None);

    let settings = BotSettings::new(channel)
        .with_login_retry(config.telegram.max_login_attempts, config.telegram.login_retry_delay());
    let bot = Arc::new(
        SignalBot::new(
            transport,
            pipeline,
            SessionStore::new(config.telegram.session_path()),
            settings,
        )
        .with_evolution(evolver, config.evolution_cadence()),
    );

    // Setup Ctrl+C handler
    let handle = Arc::clone(&bot);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        handle.stop();
    });

    bot.run().await?;

    if let Some(replay) = replay {
        let sent = replay.sent();
        println!(
            "Replayed {} signals, {} buy commands:",
            replay.signal_count(),
            sent.len()
        );
        for (recipient, command) in sent {
            println!("  {} -> {}", recipient, command);
        }
        println!("Paper trades recorded under {}", data_dir.display());
    }
    Ok(())
}

fn parse_command(cmd: &ParseCmd) -> Result<()> {
    let text = read_signal(&cmd.file)?;
    let token = parse_message(&text);
    println!("{}", serde_json::to_string_pretty(&token)?);
    Ok(())
}

async fn analyze_command(cmd: AnalyzeCmd, config: &Config) -> Result<()> {
    let text = read_signal(&cmd.file)?;
    let token = parse_message(&text);
    if !token.is_actionable() {
        println!("No KOL Buy / ATH Price marker found; nothing to analyze");
        return Ok(());
    }

    let orchestrator = AnalysisOrchestrator::new(
        build_registry(config)?,
        config.ai.risk_tolerance.clone(),
        config.trading.default_buy_amount.clone(),
    );
    let options = AnalysisOptions {
        provider: cmd.provider,
        buy_amount: cmd.buy_amount,
    };

    let result = orchestrator
        .analyze(token, &options)
        .await
        .context("Analysis failed")?;

    println!("Token:   {}", result.token_info.label());
    println!("Verdict: {}", if result.should_buy { "BUY" } else { "PASS" });
    println!("Reason:  {}", result.reason);
    println!("\n{}", result.full_analysis);
    Ok(())
}

async fn evolve_command(cmd: EvolveCmd, config: &Config) -> Result<()> {
    let evolver = build_evolver(
        config,
        &config.storage.data_path(),
        build_registry(config)?,
        cmd.provider,
    );

    match evolver.evolve().await.context("Strategy evolution failed")? {
        EvolutionOutcome::NoData => println!("No trade history to analyze"),
        EvolutionOutcome::Completed { total_trades, narrative } => {
            println!("Analyzed {} trades:\n", total_trades);
            println!("{}", narrative);
        }
    }
    Ok(())
}

async fn probe_command(cmd: ProbeCmd, config: &Config) -> Result<()> {
    let registry = build_registry(config)?;
    let provider = registry.resolve(cmd.provider.as_deref())?;
    tracing::info!("Probing provider {}...", provider.name());

    let outcome = provider.complete(PROBE_SYSTEM_PROMPT, PROBE_GREETING).await;
    let result = ProbeResult {
        provider: provider.name().to_string(),
        timestamp: Utc::now(),
        success: outcome.is_ok(),
        response: outcome.as_ref().ok().cloned(),
        error: outcome.as_ref().err().map(|e| e.to_string()),
    };

    let path = config.storage.data_path().join(PROBE_RESULT_FILE);
    write_json(&path, &result)?;
    println!("Probe result saved to {}", path.display());

    match outcome {
        Ok(reply) => {
            println!("✓ {} replied: {}", result.provider, reply);
            Ok(())
        }
        Err(e) => bail!("{} probe failed: {}", result.provider, e),
    }
}
