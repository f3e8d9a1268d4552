//! LLM Factory
//!
//! Builds the language model port from settings.
//!
//! ## Supported Providers
//! - **Azure**: Azure OpenAI deployment (`api-key` auth)
//! - **OpenAI**: OpenAI or any compatible server (bearer auth)

use std::sync::Arc;
use std::time::Duration;

use voice_chat_config::{LlmConfig, LlmProvider};
use voice_chat_core::LanguageModel;

use crate::{
    adapter::LanguageModelAdapter,
    backend::{OpenAIBackend, OpenAIConfig},
    LlmError,
};

/// LLM Factory for creating backends
pub struct LlmFactory;

impl LlmFactory {
    /// Backend configuration for the configured provider
    pub fn backend_config(config: &LlmConfig) -> Result<OpenAIConfig, LlmError> {
        let base = match config.provider {
            LlmProvider::Azure => {
                if config.endpoint.trim().is_empty() {
                    return Err(LlmError::Configuration(
                        "llm.endpoint is required for Azure OpenAI".to_string(),
                    ));
                }
                OpenAIConfig::azure(
                    config.endpoint.clone(),
                    config.api_key.clone(),
                    config.model.clone(),
                    config.api_version.clone(),
                )
            },
            LlmProvider::OpenAI => {
                let mut openai = OpenAIConfig::openai(config.api_key.clone(), config.model.clone());
                if !config.endpoint.trim().is_empty() {
                    openai.endpoint = config.endpoint.clone();
                }
                openai
            },
        };

        Ok(OpenAIConfig {
            max_tokens: config.max_tokens as usize,
            temperature: config.temperature,
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            ..base
        })
    }

    /// Create the language model port from settings
    pub fn from_settings(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
        let backend = OpenAIBackend::new(Self::backend_config(config)?)?;

        tracing::info!(
            provider = ?config.provider,
            model = %config.model,
            "Created LLM backend"
        );

        Ok(Arc::new(LanguageModelAdapter::new(backend)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_settings() -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::Azure,
            endpoint: "https://res.openai.azure.com".to_string(),
            api_key: "key".to_string(),
            model: "chat".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_azure_backend_config() {
        let config = LlmFactory::backend_config(&azure_settings()).unwrap();
        assert!(config.is_azure());
        assert_eq!(config.api_version.as_deref(), Some("2024-02-01"));
        assert_eq!(config.max_tokens, 800);
        assert_eq!(config.timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn test_azure_requires_endpoint() {
        let mut settings = azure_settings();
        settings.endpoint.clear();
        assert!(matches!(
            LlmFactory::backend_config(&settings),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_openai_custom_endpoint() {
        let settings = LlmConfig {
            provider: LlmProvider::OpenAI,
            endpoint: "http://localhost:8000/v1".to_string(),
            model: "llama".to_string(),
            ..Default::default()
        };
        let config = LlmFactory::backend_config(&settings).unwrap();
        assert!(!config.is_azure());
        assert_eq!(config.endpoint, "http://localhost:8000/v1");
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let mut settings = azure_settings();
        settings.api_key.clear();
        assert!(LlmFactory::from_settings(&settings).is_err());
    }

    #[test]
    fn test_from_settings() {
        let model = LlmFactory::from_settings(&azure_settings()).unwrap();
        assert_eq!(model.model_name(), "chat");
    }
}
