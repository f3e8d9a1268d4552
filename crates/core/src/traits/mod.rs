//! Port traits consumed by the conversation orchestrator
//!
//! Each external collaborator is a trait so backends can be swapped by
//! configuration and replaced by scripted doubles in tests.
//!
//! ```text
//! SpeechInput:   microphone / stdin → Utterance
//! LanguageModel: system prompt + user text → reply text
//! SpeechOutput:  reply text → SynthesisOutcome
//! ```

mod llm;
mod speech;

pub use llm::LanguageModel;
pub use speech::{SpeechInput, SpeechOutput};
