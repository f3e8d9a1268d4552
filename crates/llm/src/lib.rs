//! Language model integration
//!
//! Features:
//! - OpenAI and Azure OpenAI chat completions over HTTP
//! - Retries with exponential backoff for transient failures
//! - Adapter onto the core `LanguageModel` port
//! - Factory building the port from settings

pub mod adapter;
pub mod backend;
pub mod factory;

pub use adapter::LanguageModelAdapter;
pub use backend::{FinishReason, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use factory::LlmFactory;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for voice_chat_core::Error {
    fn from(err: LlmError) -> Self {
        voice_chat_core::Error::Llm(err.to_string())
    }
}
