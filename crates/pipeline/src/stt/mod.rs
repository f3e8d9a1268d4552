//! Speech input ports
//!
//! - [`AzureSpeechRecognizer`]: microphone utterance sent to Azure Speech REST
//! - [`ConsoleSpeechInput`]: typed lines stand in for spoken utterances

mod azure;
mod console;

pub use azure::{AzureSpeechRecognizer, AzureSttConfig, RecognitionStatus};
pub use console::ConsoleSpeechInput;
