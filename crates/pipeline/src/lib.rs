//! Speech ports for the voice chat loop
//!
//! Components:
//! - `audio`: microphone capture, energy endpointing, speaker playback, WAV codec
//! - `stt`: `SpeechInput` implementations (Azure Speech REST, console)
//! - `tts`: `SpeechOutput` implementations (Azure Speech REST, console)

pub mod audio;
pub mod stt;
pub mod tts;

pub use audio::{
    AudioSink, AudioSource, CapturedAudio, EndpointConfig, EndpointEvent, UtteranceDetector,
};
#[cfg(feature = "audio-io")]
pub use audio::{MicrophoneCapture, SpeakerPlayback};
pub use stt::{AzureSpeechRecognizer, AzureSttConfig, ConsoleSpeechInput, RecognitionStatus};
pub use tts::{build_ssml, AzureSpeechSynthesizer, AzureTtsConfig, ConsoleSpeechOutput};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("WAV error: {0}")]
    Wav(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Http(err.to_string())
    }
}

impl From<hound::Error> for PipelineError {
    fn from(err: hound::Error) -> Self {
        PipelineError::Wav(err.to_string())
    }
}

impl From<PipelineError> for voice_chat_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Audio(msg) | PipelineError::Device(msg) | PipelineError::Wav(msg) => {
                voice_chat_core::Error::Audio(msg)
            },
            PipelineError::Configuration(msg) => voice_chat_core::Error::Config(msg),
            PipelineError::Io(e) => voice_chat_core::Error::Io(e),
            other => voice_chat_core::Error::Internal(other.to_string()),
        }
    }
}
