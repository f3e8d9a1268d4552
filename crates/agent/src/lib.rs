//! Conversation loop
//!
//! Drives the turn-taking cycle over the three ports from `voice_chat_core`:
//! listen for one utterance, ask the language model, speak the reply, repeat
//! until the stop phrase is heard or the host asks to shut down.
//!
//! - [`ConversationOrchestrator`]: the state machine
//! - [`StopPhrase`]: normalized stop-phrase matching
//! - [`Transcript`]: where the human-readable console lines go

pub mod orchestrator;
pub mod stop_phrase;
pub mod transcript;

pub use orchestrator::{
    ConversationEvent, ConversationOrchestrator, LoopExit, LoopState, OrchestratorConfig,
    OrchestratorState, TurnOutcome,
};
pub use stop_phrase::StopPhrase;
pub use transcript::{CapturedTranscript, ConsoleTranscript, SilentTranscript, Transcript};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<AgentError> for voice_chat_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Configuration(msg) => voice_chat_core::Error::Config(msg),
        }
    }
}
