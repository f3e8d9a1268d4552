//! Audio plumbing for the speech ports
//!
//! The Azure ports never touch a device directly. They go through
//! [`AudioSource`] and [`AudioSink`], which the real devices implement when
//! the `audio-io` feature is on and which tests replace with fakes.

mod endpoint;
pub mod wav;

#[cfg(feature = "audio-io")]
mod capture;
#[cfg(feature = "audio-io")]
mod playback;

pub use endpoint::{EndpointConfig, EndpointEvent, UtteranceDetector};
#[cfg(feature = "audio-io")]
pub use capture::MicrophoneCapture;
#[cfg(feature = "audio-io")]
pub use playback::SpeakerPlayback;

use async_trait::async_trait;
use voice_chat_core::AudioFrame;

use crate::PipelineError;

/// Outcome of capturing one utterance
#[derive(Debug, Clone)]
pub enum CapturedAudio {
    /// Endpointed speech, mono, at the requested upload rate
    Speech(AudioFrame),
    /// Nothing above the speech threshold before the initial-silence timeout
    Silence,
    /// The device stopped delivering audio
    Closed,
}

/// Something that can record one endpointed utterance
#[async_trait]
pub trait AudioSource: Send + Sync + 'static {
    async fn capture_utterance(&self) -> Result<CapturedAudio, PipelineError>;
}

/// Something that can play a clip and wait for it to finish
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    async fn play(&self, frame: AudioFrame) -> Result<(), PipelineError>;
}
