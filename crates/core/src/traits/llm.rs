//! Language model port

use crate::conversation::ConversationTurn;
use crate::llm_types::{GenerateRequest, GenerateResponse};
use crate::{Error, Result};
use async_trait::async_trait;

/// Chat-completion language model
///
/// Implementations:
/// - `LanguageModelAdapter` - wraps an HTTP `LlmBackend` (OpenAI / Azure OpenAI)
/// - `ScriptedLanguageModel` - canned replies for tests
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a reply for the request
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Check whether the backend is reachable
    async fn is_available(&self) -> bool;

    /// Get model name for logging
    fn model_name(&self) -> &str;

    /// Ask for a reply to a single user utterance
    ///
    /// Stateless: only the system prompt and this user text are sent. A blank
    /// reply is reported as an error so it is never spoken.
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String> {
        let request = ConversationTurn::new(user_text, system_prompt).to_request();
        let response = self.generate(request).await?;

        if response.is_blank() {
            return Err(Error::Llm("Model returned an empty reply".to_string()));
        }
        Ok(response.text)
    }
}
