//! Default values shared across crates
//!
//! Serde defaults in `settings` and the backends both read from here so the
//! two never drift apart.

/// Conversation defaults
pub mod conversation {
    /// Phrase that ends the conversation (compared case-insensitively)
    pub const STOP_PHRASE: &str = "Stop.";

    /// System prompt sent with every user utterance
    pub const SYSTEM_PROMPT: &str = "ChatBot can have a conversation with you about any topic. \
It can give explicit instructions or say 'I don't know' if it does not have an answer.";
}

/// Speech service defaults
pub mod speech {
    /// Recognition locale
    pub const RECOGNITION_LANGUAGE: &str = "es-ES";

    /// Synthesis voice
    pub const SYNTHESIS_VOICE: &str = "es-ES-DarioNeural";

    /// Synthesis output format (RIFF container so it can be decoded as WAV)
    pub const OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";

    /// Header carrying the subscription key
    pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
}

/// Service endpoints
pub mod endpoints {
    /// OpenAI API endpoint
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Azure OpenAI REST API version
    pub const AZURE_OPENAI_API_VERSION: &str = "2024-02-01";

    /// Speech-to-text host template (`{region}` is substituted)
    pub const SPEECH_STT_HOST: &str = "https://{region}.stt.speech.microsoft.com";

    /// Text-to-speech host template (`{region}` is substituted)
    pub const SPEECH_TTS_HOST: &str = "https://{region}.tts.speech.microsoft.com";
}

/// Timeouts (in milliseconds)
pub mod timeouts {
    /// LLM request timeout
    pub const LLM_REQUEST_MS: u64 = 30_000;

    /// Speech service request timeout
    pub const SPEECH_REQUEST_MS: u64 = 15_000;
}

/// Audio capture defaults
pub mod audio {
    /// Upload sample rate for recognition (Hz)
    pub const SAMPLE_RATE: u32 = 16000;

    /// Energy above which a block counts as speech (dBFS)
    pub const ENERGY_THRESHOLD_DB: f32 = -40.0;

    /// How long to wait for speech to begin
    pub const INITIAL_SILENCE_TIMEOUT_MS: u64 = 5_000;

    /// Trailing silence that ends an utterance
    pub const END_SILENCE_MS: u64 = 800;

    /// Hard cap on a single utterance
    pub const MAX_UTTERANCE_MS: u64 = 15_000;

    /// Sample rates the capture and upload paths accept
    pub const SUPPORTED_SAMPLE_RATES: &[u32] = &[8000, 16000, 22050, 24000, 44100, 48000];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_templates_have_region() {
        assert!(endpoints::SPEECH_STT_HOST.contains("{region}"));
        assert!(endpoints::SPEECH_TTS_HOST.contains("{region}"));
    }

    #[test]
    fn test_silence_fits_inside_utterance() {
        assert!(audio::END_SILENCE_MS < audio::MAX_UTTERANCE_MS);
        assert!(audio::SUPPORTED_SAMPLE_RATES.contains(&audio::SAMPLE_RATE));
    }
}
