//! Language Model adapter
//!
//! Bridges the LlmBackend trait to the core LanguageModel trait,
//! allowing LLM backends to be used where LanguageModel is expected.

use std::sync::Arc;

use async_trait::async_trait;
use voice_chat_core::{
    llm_types::{FinishReason as CoreFinishReason, TokenUsage},
    Error, GenerateRequest, GenerateResponse, LanguageModel, Result,
};

use crate::backend::{FinishReason as BackendFinishReason, LlmBackend};

/// Adapter that wraps an LlmBackend to implement the core LanguageModel trait.
///
/// # Example
///
/// ```ignore
/// let backend = OpenAIBackend::new(config)?;
/// let language_model: Arc<dyn LanguageModel> = Arc::new(LanguageModelAdapter::new(backend));
/// ```
pub struct LanguageModelAdapter {
    backend: Arc<dyn LlmBackend>,
    model_name: String,
}

impl LanguageModelAdapter {
    /// Create a new adapter wrapping an LlmBackend
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        let model_name = backend.model_name().to_string();
        Self {
            backend: Arc::new(backend),
            model_name,
        }
    }

    /// Create from an Arc'd backend
    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        let model_name = backend.model_name().to_string();
        Self { backend, model_name }
    }

    /// Convert backend finish reason to core finish reason
    fn convert_finish_reason(reason: BackendFinishReason) -> CoreFinishReason {
        match reason {
            BackendFinishReason::Stop => CoreFinishReason::Stop,
            BackendFinishReason::Length => CoreFinishReason::Length,
            BackendFinishReason::ContentFilter => CoreFinishReason::ContentFilter,
            BackendFinishReason::Error => CoreFinishReason::Error,
        }
    }
}

#[async_trait]
impl LanguageModel for LanguageModelAdapter {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        match self.backend.generate(&request.messages).await {
            Ok(result) => {
                tracing::debug!(
                    model = %self.model_name,
                    latency_ms = result.total_time_ms,
                    completion_tokens = result.completion_tokens,
                    "LLM generation complete"
                );
                Ok(GenerateResponse {
                    text: result.text,
                    finish_reason: Self::convert_finish_reason(result.finish_reason),
                    usage: Some(TokenUsage::new(
                        result.prompt_tokens as u32,
                        result.completion_tokens as u32,
                    )),
                })
            },
            Err(e) => Err(Error::Llm(format!("LLM generation failed: {}", e))),
        }
    }

    async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GenerationResult;
    use crate::LlmError;
    use voice_chat_core::Message;

    struct MockBackend {
        reply: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn generate(
            &self,
            messages: &[Message],
        ) -> std::result::Result<GenerationResult, LlmError> {
            assert_eq!(messages.len(), 2);
            match self.reply {
                Ok(text) => Ok(GenerationResult {
                    text: text.to_string(),
                    prompt_tokens: 10,
                    completion_tokens: 2,
                    total_time_ms: 5,
                    finish_reason: BackendFinishReason::Length,
                }),
                Err(msg) => Err(LlmError::Api(msg.to_string())),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }
    }

    #[tokio::test]
    async fn test_adapter_generate() {
        let adapter = LanguageModelAdapter::new(MockBackend { reply: Ok("Hi there") });
        assert_eq!(adapter.model_name(), "mock-model");

        let response = adapter
            .generate(GenerateRequest::new("system").with_user_message("Hello"))
            .await
            .unwrap();
        assert_eq!(response.text, "Hi there");
        assert_eq!(response.finish_reason, CoreFinishReason::Length);
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }

    #[tokio::test]
    async fn test_adapter_maps_errors() {
        let adapter = LanguageModelAdapter::new(MockBackend { reply: Err("HTTP 401") });
        let err = adapter.complete("system", "Hello").await.unwrap_err();

        match err {
            Error::Llm(msg) => assert!(msg.contains("HTTP 401")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
