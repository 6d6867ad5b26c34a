//! CLI Adapter
//!
//! Command-line interface for the signal bot.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    AnalyzeCmd, CliApp, Command, EvolveCmd, ParseCmd, ProbeCmd, ProbeResult, RunCmd,
    PROBE_RESULT_FILE,
};

use anyhow::Result;

use crate::config::{Config, ConfigError};

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp, config: Result<Config, ConfigError>) -> Result<()> {
    commands::execute(app, config).await
}
