//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    Config, ConfigError, LoggingSection, ProviderSection, load_config, load_config_or_default,
    parse_config,
};
