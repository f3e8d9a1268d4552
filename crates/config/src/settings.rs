//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{audio, conversation, endpoints, speech, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - credentials checked when ports are built
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Speech service (recognition and synthesis)
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Language model service
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversation loop behaviour and port selection
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Microphone capture and endpointing
    #[serde(default)]
    pub audio: AudioConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_conversation()?;
        self.validate_llm()?;
        self.validate_audio()?;

        if self.environment.is_strict() {
            self.validate_credentials()?;
        }

        Ok(())
    }

    fn validate_conversation(&self) -> Result<(), ConfigError> {
        if self.conversation.stop_phrase.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "conversation.stop_phrase".to_string(),
                message: "Stop phrase cannot be empty".to_string(),
            });
        }

        if self.conversation.system_prompt.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "conversation.system_prompt".to_string(),
                message: "System prompt cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if llm.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    fn validate_audio(&self) -> Result<(), ConfigError> {
        let audio_cfg = &self.audio;

        if !audio::SUPPORTED_SAMPLE_RATES.contains(&audio_cfg.sample_rate) {
            return Err(ConfigError::InvalidValue {
                field: "audio.sample_rate".to_string(),
                message: format!(
                    "Unsupported sample rate {} (expected one of {:?})",
                    audio_cfg.sample_rate,
                    audio::SUPPORTED_SAMPLE_RATES
                ),
            });
        }

        if audio_cfg.end_silence_ms >= audio_cfg.max_utterance_ms {
            return Err(ConfigError::InvalidValue {
                field: "audio.end_silence_ms".to_string(),
                message: format!(
                    "Must be shorter than audio.max_utterance_ms ({}ms)",
                    audio_cfg.max_utterance_ms
                ),
            });
        }

        if audio_cfg.energy_threshold_db >= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "audio.energy_threshold_db".to_string(),
                message: "Must be negative (dBFS)".to_string(),
            });
        }

        Ok(())
    }

    /// Check that every selected remote backend has credentials
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        let uses_speech = self.conversation.input == InputBackend::Azure
            || self.conversation.output == OutputBackend::Azure;

        if uses_speech {
            require("speech.key", &self.speech.key)?;
            if self.speech.endpoint.is_none() {
                require("speech.region", &self.speech.region)?;
            }
        }

        match self.llm.provider {
            LlmProvider::Azure => {
                require("llm.endpoint", &self.llm.endpoint)?;
                require("llm.api_key", &self.llm.api_key)?;
                require("llm.model", &self.llm.model)?;
            },
            LlmProvider::OpenAI => {
                require("llm.api_key", &self.llm.api_key)?;
            },
        }

        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField(field.to_string()))
    } else {
        Ok(())
    }
}

/// Speech service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Subscription key
    #[serde(default)]
    pub key: String,

    /// Service region (e.g. "westeurope")
    #[serde(default)]
    pub region: String,

    /// Custom host overriding the regional one (e.g. a private endpoint)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Recognition locale
    #[serde(default = "default_recognition_language")]
    pub recognition_language: String,

    /// Synthesis voice name
    #[serde(default = "default_synthesis_voice")]
    pub synthesis_voice: String,

    /// Synthesis output format
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Speaking rate multiplier
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f32,

    /// Request timeout (ms)
    #[serde(default = "default_speech_timeout")]
    pub timeout_ms: u64,
}

fn default_recognition_language() -> String {
    speech::RECOGNITION_LANGUAGE.to_string()
}
fn default_synthesis_voice() -> String {
    speech::SYNTHESIS_VOICE.to_string()
}
fn default_output_format() -> String {
    speech::OUTPUT_FORMAT.to_string()
}
fn default_speaking_rate() -> f32 {
    1.0
}
fn default_speech_timeout() -> u64 {
    timeouts::SPEECH_REQUEST_MS
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            region: String::new(),
            endpoint: None,
            recognition_language: default_recognition_language(),
            synthesis_voice: default_synthesis_voice(),
            output_format: default_output_format(),
            speaking_rate: default_speaking_rate(),
            timeout_ms: default_speech_timeout(),
        }
    }
}

impl SpeechConfig {
    /// Base URL for recognition requests
    pub fn stt_host(&self) -> String {
        self.host_for(endpoints::SPEECH_STT_HOST)
    }

    /// Base URL for synthesis requests
    pub fn tts_host(&self) -> String {
        self.host_for(endpoints::SPEECH_TTS_HOST)
    }

    fn host_for(&self, template: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => template.replace("{region}", &self.region),
        }
    }
}

/// Language model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Azure OpenAI deployment
    #[default]
    Azure,
    /// OpenAI-compatible API
    #[serde(rename = "openai")]
    OpenAI,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    /// Service endpoint (Azure resource URL or OpenAI-compatible base URL)
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    /// Model name, or deployment name for Azure
    #[serde(default)]
    pub model: String,

    /// Azure OpenAI API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout (ms)
    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,

    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_version() -> String {
    endpoints::AZURE_OPENAI_API_VERSION.to_string()
}
fn default_max_tokens() -> u32 {
    800
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    timeouts::LLM_REQUEST_MS
}
fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_llm_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Where utterances come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputBackend {
    /// Default microphone + Azure Speech recognition
    #[default]
    Azure,
    /// Typed lines on stdin
    Console,
}

/// Where replies go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    /// Azure Speech synthesis + default speaker
    #[default]
    Azure,
    /// Printed to stdout
    Console,
}

/// Conversation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Phrase that ends the conversation
    #[serde(default = "default_stop_phrase")]
    pub stop_phrase: String,

    /// System prompt sent with every turn
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default)]
    pub input: InputBackend,

    #[serde(default)]
    pub output: OutputBackend,
}

fn default_stop_phrase() -> String {
    conversation::STOP_PHRASE.to_string()
}
fn default_system_prompt() -> String {
    conversation::SYSTEM_PROMPT.to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            stop_phrase: default_stop_phrase(),
            system_prompt: default_system_prompt(),
            input: InputBackend::default(),
            output: OutputBackend::default(),
        }
    }
}

/// Microphone capture and endpointing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate of the audio uploaded for recognition (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Energy above which a block counts as speech (dBFS)
    #[serde(default = "default_energy_threshold")]
    pub energy_threshold_db: f32,

    /// How long to wait for speech before reporting no-match
    #[serde(default = "default_initial_silence")]
    pub initial_silence_timeout_ms: u64,

    /// Trailing silence that ends an utterance
    #[serde(default = "default_end_silence")]
    pub end_silence_ms: u64,

    /// Hard cap on one utterance
    #[serde(default = "default_max_utterance")]
    pub max_utterance_ms: u64,
}

fn default_sample_rate() -> u32 {
    audio::SAMPLE_RATE
}
fn default_energy_threshold() -> f32 {
    audio::ENERGY_THRESHOLD_DB
}
fn default_initial_silence() -> u64 {
    audio::INITIAL_SILENCE_TIMEOUT_MS
}
fn default_end_silence() -> u64 {
    audio::END_SILENCE_MS
}
fn default_max_utterance() -> u64 {
    audio::MAX_UTTERANCE_MS
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            energy_threshold_db: default_energy_threshold(),
            initial_silence_timeout_ms: default_initial_silence(),
            end_silence_ms: default_end_silence(),
            max_utterance_ms: default_max_utterance(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics
    #[serde(default)]
    pub metrics_enabled: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: false,
            metrics_port: default_metrics_port(),
        }
    }
}

/// Load settings from the `config/` directory and the environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (VOICE_CHAT_ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Same as [`load_settings`] with an explicit configuration directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_CHAT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        dir = %dir.display(),
        env = env.unwrap_or("default"),
        "Settings loaded"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.conversation.stop_phrase, "Stop.");
        assert_eq!(settings.speech.recognition_language, "es-ES");
        assert_eq!(settings.speech.synthesis_voice, "es-ES-DarioNeural");
        assert_eq!(settings.llm.provider, LlmProvider::Azure);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_blank_stop_phrase_rejected() {
        let mut settings = Settings::default();
        settings.conversation.stop_phrase = "   ".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "conversation.stop_phrase"
        ));
    }

    #[test]
    fn test_llm_validation() {
        let mut settings = Settings::default();

        settings.llm.temperature = 2.5;
        assert!(settings.validate().is_err());
        settings.llm.temperature = 0.7;

        settings.llm.max_tokens = 0;
        assert!(settings.validate().is_err());
        settings.llm.max_tokens = 800;

        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_audio_validation() {
        let mut settings = Settings::default();

        settings.audio.sample_rate = 12345;
        assert!(settings.validate().is_err());
        settings.audio.sample_rate = 16000;

        settings.audio.end_silence_ms = settings.audio.max_utterance_ms;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_strict_environment_requires_credentials() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        assert!(matches!(settings.validate(), Err(ConfigError::MissingField(_))));

        settings.speech.key = "speech-key".to_string();
        settings.speech.region = "westeurope".to_string();
        settings.llm.endpoint = "https://example.openai.azure.com".to_string();
        settings.llm.api_key = "llm-key".to_string();
        settings.llm.model = "gpt-35-turbo".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_console_ports_skip_speech_credentials() {
        let mut settings = Settings::default();
        settings.conversation.input = InputBackend::Console;
        settings.conversation.output = OutputBackend::Console;
        settings.llm.provider = LlmProvider::OpenAI;
        settings.llm.api_key = "sk-test".to_string();
        assert!(settings.validate_credentials().is_ok());
    }

    #[test]
    fn test_speech_hosts() {
        let mut speech = SpeechConfig {
            region: "westeurope".to_string(),
            ..Default::default()
        };
        assert_eq!(speech.stt_host(), "https://westeurope.stt.speech.microsoft.com");
        assert_eq!(speech.tts_host(), "https://westeurope.tts.speech.microsoft.com");

        speech.endpoint = Some("http://localhost:5000/".to_string());
        assert_eq!(speech.stt_host(), "http://localhost:5000");
    }

    #[test]
    fn test_load_from_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.yaml"),
            "conversation:\n  stop_phrase: \"Para.\"\n  input: console\nllm:\n  provider: openai\n  max_tokens: 256\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("development.yaml"),
            "speech:\n  recognition_language: en-US\n",
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), Some("development")).unwrap();
        assert_eq!(settings.conversation.stop_phrase, "Para.");
        assert_eq!(settings.conversation.input, InputBackend::Console);
        assert_eq!(settings.conversation.output, OutputBackend::Azure);
        assert_eq!(settings.llm.provider, LlmProvider::OpenAI);
        assert_eq!(settings.llm.max_tokens, 256);
        assert_eq!(settings.speech.recognition_language, "en-US");
    }

    #[test]
    fn test_missing_directory_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("absent"), None).unwrap();
        assert_eq!(settings.audio.sample_rate, 16000);
    }

    #[test]
    fn test_invalid_file_value_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[llm]\ntemperature = 9.0\n").unwrap();

        let err = load_settings_from(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
