//! Configuration management for the voice chat loop
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (VOICE_CHAT_ prefix, `__` between sections)
//!
//! Settings are read once at startup and treated as constants for the
//! lifetime of the process.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AudioConfig, ConversationConfig, InputBackend, LlmConfig,
    LlmProvider, ObservabilityConfig, OutputBackend, RuntimeEnvironment, Settings, SpeechConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
