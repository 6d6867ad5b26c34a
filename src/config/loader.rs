//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/bot.toml.
//! Every section has defaults, so a missing section (or an empty file) is valid.
//! Secrets are normally read from environment variables named in the file.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::ai::{ProviderSettings, RetryPolicy, SamplingParams};
use crate::application::evolver::EvolutionCadence;

/// Main configuration structure matching config/bot.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub trading: TradingSection,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub evolution: EvolutionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// AI provider configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct AiSection {
    /// Provider used when a call does not name one
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Risk directive embedded in the analysis prompt (e.g. 低级/中级/高级)
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: String,
    #[serde(default)]
    pub retry: RetrySection,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Overrides merged over the built-in deepseek/openai entries
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSection>,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            risk_tolerance: default_risk_tolerance(),
            retry: RetrySection::default(),
            request_timeout_secs: default_request_timeout(),
            providers: BTreeMap::new(),
        }
    }
}

/// Rate-limit retry settings
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay unit; attempt N waits N times this
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        RetryPolicy::new(section.max_attempts, Duration::from_millis(section.base_delay_ms))
    }
}

/// One chat-completion provider
///
/// All fields are optional so a partial `[ai.providers.deepseek]` table only
/// overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderSection {
    #[serde(default)]
    pub api_url: Option<String>,
    /// Environment variable consulted when `api_url` is empty
    #[serde(default)]
    pub api_url_env: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is empty
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Accepted for compatibility; requests are always non-streaming
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(flatten)]
    pub sampling: SamplingParams,
}

impl ProviderSection {
    /// Fill every unset field from `base`
    pub fn merged_over(&self, base: &ProviderSection) -> ProviderSection {
        let s = &self.sampling;
        let b = &base.sampling;
        ProviderSection {
            api_url: self.api_url.clone().or_else(|| base.api_url.clone()),
            api_url_env: self.api_url_env.clone().or_else(|| base.api_url_env.clone()),
            model: self.model.clone().or_else(|| base.model.clone()),
            api_key: self.api_key.clone().or_else(|| base.api_key.clone()),
            api_key_env: self.api_key_env.clone().or_else(|| base.api_key_env.clone()),
            stream: self.stream.or(base.stream),
            sampling: SamplingParams {
                max_tokens: s.max_tokens.or(b.max_tokens),
                temperature: s.temperature.or(b.temperature),
                top_p: s.top_p.or(b.top_p),
                top_k: s.top_k.or(b.top_k),
                frequency_penalty: s.frequency_penalty.or(b.frequency_penalty),
                n: s.n.or(b.n),
            },
        }
    }

    /// Get API key with environment variable fallback
    pub fn get_api_key(&self) -> Option<String> {
        non_empty(self.api_key.as_deref()).or_else(|| env_value(self.api_key_env.as_deref()))
    }

    /// Get API URL with environment variable fallback
    pub fn get_api_url(&self) -> Option<String> {
        non_empty(self.api_url.as_deref()).or_else(|| env_value(self.api_url_env.as_deref()))
    }
}

/// Built-in provider entries
pub fn builtin_providers() -> BTreeMap<String, ProviderSection> {
    let mut providers = BTreeMap::new();
    providers.insert(
        "deepseek".to_string(),
        ProviderSection {
            api_url_env: Some("DEEPSEEK_API_URL".to_string()),
            model: Some("deepseek-ai/DeepSeek-V3".to_string()),
            api_key_env: Some("DEEPSEEK_API_KEY".to_string()),
            stream: Some(false),
            sampling: SamplingParams {
                max_tokens: Some(1024),
                temperature: Some(0.7),
                top_p: Some(0.7),
                top_k: Some(50),
                frequency_penalty: Some(0.5),
                n: Some(1),
            },
            ..Default::default()
        },
    );
    providers.insert(
        "openai".to_string(),
        ProviderSection {
            api_url_env: Some("OPENAI_API_URL".to_string()),
            model: Some("gpt-4".to_string()),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            stream: Some(false),
            sampling: SamplingParams {
                max_tokens: Some(1024),
                temperature: Some(0.7),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    providers
}

/// Trade command configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSection {
    /// Amount placed verbatim into `/buy <address> <amount>`
    #[serde(default = "default_buy_amount")]
    pub default_buy_amount: String,
    /// Account that receives trade commands
    #[serde(default = "default_recipient")]
    pub recipient: String,
}

impl Default for TradingSection {
    fn default() -> Self {
        Self {
            default_buy_amount: default_buy_amount(),
            recipient: default_recipient(),
        }
    }
}

/// Telegram transport configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,
    /// Channel username (`@name` or `name`) or numeric chat id
    #[serde(default)]
    pub monitor_channel: Option<String>,
    #[serde(default = "default_session_file")]
    pub session_file: String,
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
    #[serde(default = "default_login_retry_delay")]
    pub login_retry_delay_secs: u64,
    /// Long-poll timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_token_env: default_bot_token_env(),
            monitor_channel: None,
            session_file: default_session_file(),
            max_login_attempts: default_max_login_attempts(),
            login_retry_delay_secs: default_login_retry_delay(),
            poll_timeout_secs: default_poll_timeout(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl TelegramSection {
    /// Get bot token with environment variable fallback
    pub fn get_bot_token(&self) -> Option<String> {
        non_empty(self.bot_token.as_deref()).or_else(|| env_value(Some(&self.bot_token_env)))
    }

    /// Get monitored channel, checking TELEGRAM_MONITOR_CHANNEL when unset
    pub fn get_monitor_channel(&self) -> Option<String> {
        non_empty(self.monitor_channel.as_deref())
            .or_else(|| env_value(Some("TELEGRAM_MONITOR_CHANNEL")))
    }

    /// Session file path (handles ~ for home directory)
    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.session_file).to_string())
    }

    pub fn login_retry_delay(&self) -> Duration {
        Duration::from_secs(self.login_retry_delay_secs)
    }
}

/// Subdirectory of `data_dir` used by paper runs
pub const PAPER_DIR: &str = "paper";

/// Local persistence configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// Directory holding trades.json and the analysis archive
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Maximum trade records kept (oldest evicted first)
    #[serde(default = "default_trade_capacity")]
    pub trade_capacity: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            trade_capacity: default_trade_capacity(),
        }
    }
}

impl StorageSection {
    /// Data directory (handles ~ for home directory)
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir).to_string())
    }

    /// Where paper runs keep their history, apart from live trades
    pub fn paper_data_path(&self) -> PathBuf {
        self.data_path().join(PAPER_DIR)
    }

    pub fn data_path_for(&self, paper: bool) -> PathBuf {
        if paper {
            self.paper_data_path()
        } else {
            self.data_path()
        }
    }
}

/// When strategy evolution runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceKind {
    #[default]
    OnSessionStart,
    Interval,
    Manual,
}

/// Longest accepted evolution period
pub const MAX_INTERVAL_HOURS: u64 = 24 * 365;

/// Strategy evolution configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct EvolutionSection {
    #[serde(default)]
    pub cadence: CadenceKind,
    /// Only used with `cadence = "interval"`
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    /// Provider for the meta-analysis; the default provider when unset
    #[serde(default)]
    pub provider: Option<String>,
}

impl Default for EvolutionSection {
    fn default() -> Self {
        Self {
            cadence: CadenceKind::default(),
            interval_hours: default_interval_hours(),
            provider: None,
        }
    }
}

impl From<&EvolutionSection> for EvolutionCadence {
    fn from(section: &EvolutionSection) -> Self {
        match section.cadence {
            CadenceKind::OnSessionStart => EvolutionCadence::OnSessionStart,
            CadenceKind::Interval => EvolutionCadence::Interval(Duration::from_secs(
                section.interval_hours.saturating_mul(3600),
            )),
            CadenceKind::Manual => EvolutionCadence::Manual,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log to file (in addition to stdout)
    #[serde(default)]
    pub log_to_file: bool,
    /// Log file path; its directory receives the daily rolling files
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: false,
            log_file: default_log_file(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_provider() -> String { "deepseek".to_string() }
fn default_risk_tolerance() -> String { "中级".to_string() }
fn default_request_timeout() -> u64 { 120 }
fn default_max_attempts() -> u32 { 3 }
fn default_base_delay_ms() -> u64 { 2000 }
fn default_buy_amount() -> String { "0.01".to_string() }
fn default_recipient() -> String { "@US_GMGNBOT".to_string() }
fn default_bot_token_env() -> String { "TELEGRAM_BOT_TOKEN".to_string() }
fn default_session_file() -> String { "data/session.json".to_string() }
fn default_max_login_attempts() -> u32 { 3 }
fn default_login_retry_delay() -> u64 { 5 }
fn default_poll_timeout() -> u64 { 30 }
fn default_api_base_url() -> String { "https://api.telegram.org".to_string() }
fn default_data_dir() -> String { "logs".to_string() }
fn default_trade_capacity() -> usize { 100 }
fn default_interval_hours() -> u64 { 24 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> String { "logs/signal-bot.log".to_string() }

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn env_value(var: Option<&str>) -> Option<String> {
    var.and_then(|name| std::env::var(name).ok())
        .and_then(|v| non_empty(Some(&v)))
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// `@name` whose name ends in `bot`, as Telegram requires of bot accounts
pub fn is_bot_username(chat: &str) -> bool {
    chat.strip_prefix('@')
        .is_some_and(|name| name.to_ascii_lowercase().ends_with("bot"))
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }
    load_config(path)
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Refuse a recipient the Bot API transport can never deliver to
    ///
    /// Telegram bots cannot message other bots, and every bot username
    /// ends in `bot`. Checked only when the live Bot API transport starts.
    pub fn validate_bot_api_recipient(&self) -> Result<(), ConfigError> {
        let recipient = self.trading.recipient.trim();
        if is_bot_username(recipient) {
            return Err(ConfigError::ValidationError(format!(
                "[trading].recipient {} is a bot account and the Telegram Bot API cannot message other bots; \
                 set it to a user, group or channel chat the bot can post to, or use run --paper",
                recipient
            )));
        }
        Ok(())
    }

    /// Validate all configuration parameters
    ///
    /// Credentials are not checked here; they are checked when first used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let providers = self.providers();

        if !providers.contains_key(&self.ai.default_provider) {
            return Err(ConfigError::ValidationError(format!(
                "default_provider '{}' is not a configured provider (known: {})",
                self.ai.default_provider,
                providers.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        if let Some(name) = &self.evolution.provider {
            if !providers.contains_key(name) {
                return Err(ConfigError::ValidationError(format!(
                    "evolution provider '{}' is not a configured provider",
                    name
                )));
            }
        }

        for (name, provider) in &providers {
            if provider.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{}' has no model",
                    name
                )));
            }
        }

        if self.ai.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry max_attempts must be >= 1".to_string(),
            ));
        }

        if self.storage.trade_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "trade_capacity must be >= 1".to_string(),
            ));
        }

        if self.trading.default_buy_amount.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_buy_amount cannot be empty".to_string(),
            ));
        }

        if self.trading.recipient.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "recipient cannot be empty".to_string(),
            ));
        }

        if self.telegram.max_login_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_login_attempts must be >= 1".to_string(),
            ));
        }

        if self.evolution.cadence == CadenceKind::Interval && self.evolution.interval_hours == 0 {
            return Err(ConfigError::ValidationError(
                "interval cadence requires interval_hours > 0".to_string(),
            ));
        }

        if self.evolution.interval_hours > MAX_INTERVAL_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "interval_hours must be <= {} (one year), got {}",
                MAX_INTERVAL_HOURS, self.evolution.interval_hours
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging level must be one of {:?}, got '{}'",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }

    /// Built-in providers with the file's overrides applied
    pub fn providers(&self) -> BTreeMap<String, ProviderSection> {
        let mut merged = builtin_providers();
        for (name, section) in &self.ai.providers {
            let entry = match merged.get(name) {
                Some(base) => section.merged_over(base),
                None => section.clone(),
            };
            merged.insert(name.clone(), entry);
        }
        merged
    }

    /// Resolved client settings for every provider
    pub fn provider_settings(&self) -> Vec<ProviderSettings> {
        let retry = RetryPolicy::from(&self.ai.retry);
        let timeout = Duration::from_secs(self.ai.request_timeout_secs);

        self.providers()
            .into_iter()
            .map(|(name, section)| ProviderSettings {
                api_key: section.get_api_key(),
                api_url: section.get_api_url(),
                model: section.model.clone().unwrap_or_default(),
                sampling: section.sampling.clone(),
                timeout,
                retry,
                name,
            })
            .collect()
    }

    pub fn evolution_cadence(&self) -> EvolutionCadence {
        EvolutionCadence::from(&self.evolution)
    }
}
