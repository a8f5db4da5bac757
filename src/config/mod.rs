//! Configuration management for ItemBox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use itembox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `ITEMBOX__<section>__<key>`
//!
//! Examples:
//! - `ITEMBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `ITEMBOX__SIMULATION__SERVER_ERROR_THRESHOLD=1`
//!
//! API tokens are secrets and are only read from `ITEMBOX_API_TOKENS`
//! (comma separated).
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/itembox.toml`.
//! This can be overridden using the `ITEMBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{AuthConfig, Config, RetentionConfig, ServerConfig, SimulationConfig};
pub use sources::parse_tokens;
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`ITEMBOX__*`, `ITEMBOX_API_TOKENS`)
    /// 2. TOML file (default: `config/itembox.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration assembled in code
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }
}
