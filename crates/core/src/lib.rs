//! Core traits and types for the voice chat loop
//!
//! This crate provides foundational types used across all other crates:
//! - Port traits for the three external collaborators (speech in, LLM, speech out)
//! - Recognition and synthesis result types
//! - Audio frame types and processing
//! - Chat-completion message types
//! - Scripted port implementations for deterministic testing
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod llm_types;
pub mod scripted;
pub mod traits;
pub mod utterance;
pub mod voice_config;

pub use audio::{AudioFrame, SampleRate};
pub use conversation::ConversationTurn;
pub use error::{Error, Result};
pub use llm_types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage};
pub use scripted::{
    CallLog, PortCall, ScriptedLanguageModel, ScriptedSpeechInput, ScriptedSpeechOutput,
};
pub use traits::{LanguageModel, SpeechInput, SpeechOutput};
pub use utterance::{CancellationDetails, CancellationReason, SynthesisOutcome, Utterance};
pub use voice_config::VoiceConfig;
