//! Port construction
//!
//! Every device handle and service client is acquired here, once, before the
//! loop starts. Any failure is fatal: the process exits without entering the
//! loop.

use std::sync::Arc;

use tokio::sync::watch;
use voice_chat_agent::{AgentError, OrchestratorConfig};
use voice_chat_config::{ConfigError, InputBackend, OutputBackend, Settings};
use voice_chat_core::{LanguageModel, SpeechInput, SpeechOutput};
use voice_chat_llm::{LlmError, LlmFactory};
use voice_chat_pipeline::{ConsoleSpeechInput, ConsoleSpeechOutput, PipelineError};

/// Fatal startup errors
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Language model unavailable: {0}")]
    Llm(#[from] LlmError),

    #[error("Speech port unavailable: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid conversation settings: {0}")]
    Agent(#[from] AgentError),

    #[error("Unsupported backend: {0}")]
    Unsupported(String),
}

/// The three ports plus the shutdown channel they may raise
pub struct Ports {
    pub input: Arc<dyn SpeechInput>,
    pub llm: Arc<dyn LanguageModel>,
    pub output: Arc<dyn SpeechOutput>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Ports {
    /// Sender for signal handlers (and for ports that see end of input)
    pub fn shutdown_handle(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.shutdown)
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// Orchestrator settings, checked before any port is acquired
pub fn orchestrator_config(settings: &Settings) -> Result<OrchestratorConfig, StartupError> {
    let config = OrchestratorConfig::from_settings(&settings.conversation);
    config.validate()?;
    Ok(config)
}

/// Acquire every port the settings select
pub fn build_ports(settings: &Settings) -> Result<Ports, StartupError> {
    settings.validate_credentials()?;

    let (tx, _rx) = watch::channel(false);
    let shutdown = Arc::new(tx);

    let llm = LlmFactory::from_settings(&settings.llm)?;
    let input = build_input(settings, &shutdown)?;
    let output = build_output(settings)?;

    tracing::info!(
        input = input.name(),
        model = llm.model_name(),
        output = output.name(),
        "Ports acquired"
    );

    Ok(Ports {
        input,
        llm,
        output,
        shutdown,
    })
}

fn build_input(
    settings: &Settings,
    shutdown: &Arc<watch::Sender<bool>>,
) -> Result<Arc<dyn SpeechInput>, StartupError> {
    match settings.conversation.input {
        InputBackend::Console => Ok(Arc::new(
            ConsoleSpeechInput::stdin()
                .with_shutdown_on_eof(Arc::clone(shutdown))
                .with_cancel(shutdown.subscribe()),
        )),
        InputBackend::Azure => azure_input(settings),
    }
}

fn build_output(settings: &Settings) -> Result<Arc<dyn SpeechOutput>, StartupError> {
    match settings.conversation.output {
        OutputBackend::Console => Ok(Arc::new(ConsoleSpeechOutput::stdout())),
        OutputBackend::Azure => azure_output(settings),
    }
}

#[cfg(feature = "audio-io")]
fn azure_input(settings: &Settings) -> Result<Arc<dyn SpeechInput>, StartupError> {
    use voice_chat_pipeline::{
        AudioSource, AzureSpeechRecognizer, AzureSttConfig, EndpointConfig, MicrophoneCapture,
    };

    let stt = AzureSttConfig::from_settings(&settings.speech, &settings.audio);
    let microphone: Arc<dyn AudioSource> = Arc::new(MicrophoneCapture::open(
        EndpointConfig::from(&settings.audio),
        stt.upload_rate,
    )?);
    Ok(Arc::new(AzureSpeechRecognizer::new(stt, microphone)?))
}

#[cfg(not(feature = "audio-io"))]
fn azure_input(_settings: &Settings) -> Result<Arc<dyn SpeechInput>, StartupError> {
    Err(StartupError::Unsupported(
        "azure speech input needs the audio-io feature".into(),
    ))
}

#[cfg(feature = "audio-io")]
fn azure_output(settings: &Settings) -> Result<Arc<dyn SpeechOutput>, StartupError> {
    use voice_chat_pipeline::{AudioSink, AzureSpeechSynthesizer, AzureTtsConfig, SpeakerPlayback};

    let speaker: Arc<dyn AudioSink> = Arc::new(SpeakerPlayback::open()?);
    Ok(Arc::new(AzureSpeechSynthesizer::new(
        AzureTtsConfig::from_settings(&settings.speech),
        speaker,
    )?))
}

#[cfg(not(feature = "audio-io"))]
fn azure_output(_settings: &Settings) -> Result<Arc<dyn SpeechOutput>, StartupError> {
    Err(StartupError::Unsupported(
        "azure speech output needs the audio-io feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_chat_config::LlmProvider;

    fn console_settings() -> Settings {
        let mut settings = Settings::default();
        settings.conversation.input = InputBackend::Console;
        settings.conversation.output = OutputBackend::Console;
        settings.llm.provider = LlmProvider::OpenAI;
        settings.llm.api_key = "sk-test".into();
        settings.llm.model = "gpt-4o-mini".into();
        settings
    }

    #[tokio::test]
    async fn test_console_ports() {
        let ports = build_ports(&console_settings()).unwrap();
        assert_eq!(ports.input.name(), "console-input");
        assert_eq!(ports.output.name(), "console-output");
        assert_eq!(ports.llm.model_name(), "gpt-4o-mini");
        assert!(!*ports.shutdown_receiver().borrow());
    }

    #[tokio::test]
    async fn test_shutdown_handle_reaches_receivers() {
        let ports = build_ports(&console_settings()).unwrap();
        let rx = ports.shutdown_receiver();
        ports.shutdown_handle().send_replace(true);
        assert!(*rx.borrow());
    }

    #[test]
    fn test_blank_system_prompt_is_fatal() {
        let mut settings = console_settings();
        settings.conversation.system_prompt = "  ".into();
        assert!(matches!(
            orchestrator_config(&settings),
            Err(StartupError::Agent(AgentError::Configuration(_)))
        ));

        let config = orchestrator_config(&console_settings()).unwrap();
        assert_eq!(config.stop_phrase, "Stop.");
    }

    #[test]
    fn test_missing_llm_key_is_fatal() {
        let mut settings = console_settings();
        settings.llm.api_key.clear();
        assert!(matches!(
            build_ports(&settings),
            Err(StartupError::Config(ConfigError::MissingField(_)))
        ));
    }

    #[test]
    fn test_azure_speech_needs_a_key() {
        let mut settings = console_settings();
        settings.conversation.input = InputBackend::Azure;
        assert!(matches!(
            build_ports(&settings),
            Err(StartupError::Config(ConfigError::MissingField(_)))
        ));
    }
}
