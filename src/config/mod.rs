//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `INTERVIEWER` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use interviewer::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Generating questions with {}", config.ai.model);
//! ```

mod ai;
mod database;
mod error;
mod logging;

pub use ai::{AiConfig, DEFAULT_SYSTEM_PROMPT};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;

use secrecy::Secret;
use serde::Deserialize;

/// Variable consulted when `INTERVIEWER__AI__OPENAI_API_KEY` is not set.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Completion API configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Conversation store; absent when running on the in-memory repository
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `INTERVIEWER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Falls back to `OPENAI_API_KEY` for the completion API key
    ///
    /// # Environment Variable Format
    ///
    /// - `INTERVIEWER__AI__MODEL=gpt-4` -> `ai.model = "gpt-4"`
    /// - `INTERVIEWER__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("INTERVIEWER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if config.ai.api_key().is_none() {
            config.ai.openai_api_key = std::env::var(OPENAI_API_KEY_VAR)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(Secret::new);
        }

        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.logging.validate()?;
        Ok(())
    }
}
