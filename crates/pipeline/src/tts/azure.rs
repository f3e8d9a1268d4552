//! Azure Speech synthesis over REST

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use voice_chat_config::constants::speech::SUBSCRIPTION_KEY_HEADER;
use voice_chat_config::SpeechConfig;
use voice_chat_core::{CancellationDetails, SpeechOutput, SynthesisOutcome, VoiceConfig};

use crate::audio::{wav, AudioSink};
use crate::PipelineError;

/// Synthesis endpoint configuration
#[derive(Debug, Clone)]
pub struct AzureTtsConfig {
    /// Base URL, e.g. `https://westeurope.tts.speech.microsoft.com`
    pub host: String,
    /// Subscription key
    pub key: String,
    /// Voice, locale and speed
    pub voice: VoiceConfig,
    /// `X-Microsoft-OutputFormat`; must be a RIFF format
    pub output_format: String,
    /// Request timeout
    pub timeout: Duration,
}

impl AzureTtsConfig {
    pub fn from_settings(speech: &SpeechConfig) -> Self {
        let voice = VoiceConfig::new(voice_locale(speech), speech.synthesis_voice.clone())
            .with_speed(speech.speaking_rate);
        Self {
            host: speech.tts_host(),
            key: speech.key.clone(),
            voice,
            output_format: speech.output_format.clone(),
            timeout: Duration::from_millis(speech.timeout_ms),
        }
    }

    fn synthesis_url(&self) -> String {
        format!("{}/cognitiveservices/v1", self.host.trim_end_matches('/'))
    }
}

/// Locale prefix of a neural voice name ("es-ES-DarioNeural" -> "es-ES"),
/// falling back to the recognition language
fn voice_locale(speech: &SpeechConfig) -> String {
    let mut parts = speech.synthesis_voice.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lang), Some(region), Some(_)) if !lang.is_empty() && !region.is_empty() => {
            format!("{}-{}", lang, region)
        },
        _ => speech.recognition_language.clone(),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// SSML document speaking `text` with `voice`
pub fn build_ssml(text: &str, voice: &VoiceConfig) -> String {
    let body = escape_xml(text);
    let body = match voice.prosody_rate() {
        Some(rate) => format!("<prosody rate='{}'>{}</prosody>", rate, body),
        None => body,
    };
    format!(
        "<speak version='1.0' xml:lang='{}'><voice name='{}'>{}</voice></speak>",
        escape_xml(&voice.locale),
        escape_xml(&voice.voice_name),
        body
    )
}

/// Speech output that synthesizes remotely and plays through a local sink
pub struct AzureSpeechSynthesizer {
    config: AzureTtsConfig,
    sink: Arc<dyn AudioSink>,
    client: reqwest::Client,
}

impl AzureSpeechSynthesizer {
    pub fn new(config: AzureTtsConfig, sink: Arc<dyn AudioSink>) -> Result<Self, PipelineError> {
        if config.key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "Speech subscription key is required".into(),
            ));
        }
        if config.host.trim().is_empty() || config.host.contains("{region}") {
            return Err(PipelineError::Configuration(
                "Speech region or endpoint is required".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            host = %config.host,
            voice = %config.voice.voice_name,
            "Azure speech synthesizer ready"
        );

        Ok(Self {
            config,
            sink,
            client,
        })
    }

    async fn synthesize(&self, text: &str) -> Result<(), PipelineError> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.config.synthesis_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.config.output_format)
            .header(reqwest::header::USER_AGENT, "voice-chat")
            .body(build_ssml(text, &self.config.voice))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Http(format!("HTTP {}: {}", status, detail)));
        }

        let audio = response.bytes().await?;
        let frame = wav::decode_wav(&audio)?;

        tracing::debug!(
            chars = text.chars().count(),
            audio_ms = frame.duration_ms(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Synthesis response"
        );

        self.sink.play(frame).await
    }
}

#[async_trait]
impl SpeechOutput for AzureSpeechSynthesizer {
    async fn speak(&self, text: &str) -> SynthesisOutcome {
        if text.trim().is_empty() {
            return SynthesisOutcome::Canceled(CancellationDetails::other());
        }

        match self.synthesize(text).await {
            Ok(()) => SynthesisOutcome::Completed,
            Err(e) => {
                tracing::warn!(error = %e, "Speech synthesis failed");
                SynthesisOutcome::Canceled(CancellationDetails::error(e.to_string()))
            },
        }
    }

    fn name(&self) -> &str {
        "azure-speech-synthesizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_chat_test_support::{stub_server, StubResponse};
    use parking_lot::Mutex;
    use voice_chat_core::{AudioFrame, CancellationReason, SampleRate};

    #[derive(Default)]
    struct RecordingSink {
        played: Mutex<Vec<AudioFrame>>,
    }

    #[async_trait]
    impl AudioSink for RecordingSink {
        async fn play(&self, frame: AudioFrame) -> Result<(), PipelineError> {
            self.played.lock().push(frame);
            Ok(())
        }
    }

    fn config(host: &str) -> AzureTtsConfig {
        AzureTtsConfig {
            host: host.to_string(),
            key: "secret".to_string(),
            voice: VoiceConfig::default(),
            output_format: "riff-24khz-16bit-mono-pcm".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn wav_body() -> Vec<u8> {
        let frame = AudioFrame::new(vec![0.1; 2400], SampleRate::Hz24000, 0);
        wav::encode_wav(&frame).unwrap()
    }

    #[test]
    fn test_ssml_escapes_text() {
        let ssml = build_ssml("Tom & Jerry <3", &VoiceConfig::default());
        assert_eq!(
            ssml,
            "<speak version='1.0' xml:lang='es-ES'><voice name='es-ES-DarioNeural'>Tom &amp; Jerry &lt;3</voice></speak>"
        );
    }

    #[test]
    fn test_ssml_prosody_for_speed() {
        let voice = VoiceConfig::default().with_speed(1.2);
        let ssml = build_ssml("Hola", &voice);
        assert!(ssml.contains("<prosody rate='+20%'>Hola</prosody>"));
    }

    #[test]
    fn test_voice_locale_from_name() {
        let mut speech = SpeechConfig::default();
        speech.synthesis_voice = "en-US-JennyNeural".into();
        assert_eq!(voice_locale(&speech), "en-US");
        speech.synthesis_voice = "custom".into();
        assert_eq!(voice_locale(&speech), speech.recognition_language);
    }

    #[tokio::test]
    async fn test_speak_plays_decoded_audio() {
        let (url, requests) = stub_server(vec![StubResponse::audio(wav_body())])
            .await
            .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let synthesizer = AzureSpeechSynthesizer::new(config(&url), sink.clone()).unwrap();

        assert_eq!(synthesizer.speak("Buenos días").await, SynthesisOutcome::Completed);

        let played = sink.played.lock();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].sample_rate, SampleRate::Hz24000);
        assert_eq!(played[0].samples.len(), 2400);

        let requests = requests.lock();
        assert!(requests[0].request_line().starts_with("POST /cognitiveservices/v1"));
        assert_eq!(
            requests[0].header("X-Microsoft-OutputFormat").as_deref(),
            Some("riff-24khz-16bit-mono-pcm")
        );
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(body.contains("Buenos días"));
    }

    #[tokio::test]
    async fn test_service_error_cancels() {
        let (url, _) = stub_server(vec![StubResponse::json(429, r#"{"error":"throttled"}"#)])
            .await
            .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let synthesizer = AzureSpeechSynthesizer::new(config(&url), sink.clone()).unwrap();

        match synthesizer.speak("Hola").await {
            SynthesisOutcome::Canceled(details) => {
                assert!(details.is_error());
                assert!(details.error_details.as_deref().unwrap_or_default().contains("429"));
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(sink.played.lock().is_empty());
    }

    #[tokio::test]
    async fn test_blank_text_is_not_sent() {
        let (url, requests) = stub_server(vec![]).await.unwrap();
        let synthesizer =
            AzureSpeechSynthesizer::new(config(&url), Arc::new(RecordingSink::default())).unwrap();

        match synthesizer.speak("   ").await {
            SynthesisOutcome::Canceled(details) => {
                assert_eq!(details.reason, CancellationReason::Other)
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(requests.lock().is_empty());
    }
}
