//! Signal Bot - AI verdicts on Telegram trading alerts
//!
//! Listens to a KOL/ATH alert channel and sends /buy commands to a trading
//! bot when the configured LLM recommends a buy.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use signal_bot::adapters::cli;
use signal_bot::config::{load_config_or_default, LoggingSection};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in bot.toml)
    dotenvy::dotenv().ok();

    let app = cli::init();
    let config = load_config_or_default(&app.config);

    let _guard = init_logging(app.verbose, app.debug, config.as_ref().ok().map(|c| &c.logging));
    if !app.config.exists() {
        tracing::warn!("Config file {} not found, using defaults", app.config.display());
    }

    cli::execute(app, config).await
}

/// Console logging plus an optional daily-rolling file
///
/// `RUST_LOG` wins over the flags; `--debug` and `-v` win over `[logging].level`.
fn init_logging(verbose: bool, debug: bool, logging: Option<&LoggingSection>) -> Option<WorkerGuard> {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.map(|l| l.level.as_str()).unwrap_or("info")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match logging.filter(|l| l.log_to_file) {
        Some(section) => match file_writer(Path::new(&section.log_file)) {
            Some((writer, guard)) => (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                ),
                Some(guard),
            ),
            None => (None, None),
        },
        None => (None, None),
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

/// Non-blocking daily appender for `log_file`, or `None` if its directory
/// cannot be written
fn file_writer(log_file: &Path) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file.file_name()?.to_owned();

    // rolling::daily panics if it cannot create the file
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "Warning: Could not create log directory {} ({}), file logging disabled",
            dir.display(),
            e
        );
        return None;
    }
    let probe = dir.join(".signal_bot_write_test");
    match std::fs::OpenOptions::new().create(true).append(true).open(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            return None;
        }
    }

    let appender = tracing_appender::rolling::daily(dir, file_name);
    Some(tracing_appender::non_blocking(appender))
}
