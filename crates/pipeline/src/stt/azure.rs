//! Azure Speech short-audio recognition over REST
//!
//! One captured utterance is uploaded as a WAV body and the `simple`
//! response format is mapped onto [`Utterance`]. Failures never escape as
//! errors: they come back as canceled utterances with details so the loop
//! can log them and keep listening.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use voice_chat_config::constants::speech::SUBSCRIPTION_KEY_HEADER;
use voice_chat_config::{AudioConfig, SpeechConfig};
use voice_chat_core::{
    AudioFrame, CancellationDetails, SampleRate, SpeechInput, Utterance,
};

use crate::audio::{wav, AudioSource, CapturedAudio};
use crate::PipelineError;

/// Recognition endpoint configuration
#[derive(Debug, Clone)]
pub struct AzureSttConfig {
    /// Base URL, e.g. `https://westeurope.stt.speech.microsoft.com`
    pub host: String,
    /// Subscription key
    pub key: String,
    /// Recognition locale
    pub language: String,
    /// Request timeout
    pub timeout: Duration,
    /// Rate of the uploaded WAV
    pub upload_rate: SampleRate,
}

impl AzureSttConfig {
    pub fn from_settings(speech: &SpeechConfig, audio: &AudioConfig) -> Self {
        Self {
            host: speech.stt_host(),
            key: speech.key.clone(),
            language: speech.recognition_language.clone(),
            timeout: Duration::from_millis(speech.timeout_ms),
            upload_rate: SampleRate::from_hz(audio.sample_rate).unwrap_or_default(),
        }
    }

    fn recognition_url(&self) -> String {
        format!(
            "{}/speech/recognition/conversation/cognitiveservices/v1?language={}&format=simple",
            self.host.trim_end_matches('/'),
            self.language
        )
    }
}

/// `RecognitionStatus` values of the simple response format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RecognitionStatus {
    Success,
    NoMatch,
    InitialSilenceTimeout,
    BabbleTimeout,
    Error,
    EndOfDictation,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SimpleRecognitionResponse {
    recognition_status: RecognitionStatus,
    #[serde(default)]
    display_text: Option<String>,
}

impl SimpleRecognitionResponse {
    fn into_utterance(self) -> Utterance {
        match self.recognition_status {
            RecognitionStatus::Success => match self.display_text {
                Some(text) if !text.trim().is_empty() => Utterance::recognized(text),
                _ => Utterance::NoMatch,
            },
            RecognitionStatus::NoMatch
            | RecognitionStatus::InitialSilenceTimeout
            | RecognitionStatus::BabbleTimeout => Utterance::NoMatch,
            RecognitionStatus::EndOfDictation => {
                Utterance::canceled(CancellationDetails::end_of_stream())
            },
            status @ (RecognitionStatus::Error | RecognitionStatus::Unknown) => {
                Utterance::canceled(CancellationDetails::error(format!(
                    "Recognition status {:?}",
                    status
                )))
            },
        }
    }
}

/// Speech input backed by a local audio source and the Azure REST endpoint
pub struct AzureSpeechRecognizer {
    config: AzureSttConfig,
    source: Arc<dyn AudioSource>,
    client: reqwest::Client,
}

impl AzureSpeechRecognizer {
    pub fn new(config: AzureSttConfig, source: Arc<dyn AudioSource>) -> Result<Self, PipelineError> {
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
            language = %config.language,
            "Azure speech recognizer ready"
        );

        Ok(Self {
            config,
            source,
            client,
        })
    }

    async fn recognize(&self, frame: &AudioFrame) -> Result<Utterance, PipelineError> {
        let body = wav::encode_wav(frame)?;
        let started = Instant::now();

        let response = self
            .client
            .post(self.config.recognition_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.key)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!(
                    "audio/wav; codecs=audio/pcm; samplerate={}",
                    frame.sample_rate.as_u32()
                ),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Http(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: SimpleRecognitionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Http(format!("Invalid recognition response: {}", e)))?;

        tracing::debug!(
            status = ?parsed.recognition_status,
            audio_ms = frame.duration_ms(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Recognition response"
        );

        Ok(parsed.into_utterance())
    }
}

#[async_trait]
impl SpeechInput for AzureSpeechRecognizer {
    async fn listen_once(&self) -> Utterance {
        let captured = match self.source.capture_utterance().await {
            Ok(captured) => captured,
            Err(e) => {
                tracing::warn!(error = %e, "Audio capture failed");
                return Utterance::canceled(CancellationDetails::error(e.to_string()));
            },
        };

        let frame = match captured {
            CapturedAudio::Speech(frame) if !frame.is_empty() => frame,
            CapturedAudio::Speech(_) | CapturedAudio::Silence => return Utterance::NoMatch,
            CapturedAudio::Closed => {
                return Utterance::canceled(CancellationDetails::end_of_stream())
            },
        };

        match self.recognize(&frame).await {
            Ok(utterance) => utterance,
            Err(e) => {
                tracing::warn!(error = %e, "Recognition request failed");
                Utterance::canceled(CancellationDetails::error(e.to_string()))
            },
        }
    }

    fn name(&self) -> &str {
        "azure-speech-recognizer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_chat_test_support::{stub_server, StubResponse};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use voice_chat_core::CancellationReason;

    struct FakeSource {
        captures: Mutex<VecDeque<Result<CapturedAudio, PipelineError>>>,
    }

    impl FakeSource {
        fn new(captures: Vec<Result<CapturedAudio, PipelineError>>) -> Arc<Self> {
            Arc::new(Self {
                captures: Mutex::new(captures.into()),
            })
        }
    }

    #[async_trait]
    impl AudioSource for FakeSource {
        async fn capture_utterance(&self) -> Result<CapturedAudio, PipelineError> {
            self.captures
                .lock()
                .pop_front()
                .unwrap_or(Ok(CapturedAudio::Closed))
        }
    }

    fn speech() -> CapturedAudio {
        CapturedAudio::Speech(AudioFrame::new(vec![0.2; 1600], SampleRate::Hz16000, 0))
    }

    fn config(host: &str) -> AzureSttConfig {
        AzureSttConfig {
            host: host.to_string(),
            key: "secret".to_string(),
            language: "es-ES".to_string(),
            timeout: Duration::from_secs(5),
            upload_rate: SampleRate::Hz16000,
        }
    }

    #[test]
    fn test_status_mapping() {
        let parse = |json: &str| {
            serde_json::from_str::<SimpleRecognitionResponse>(json)
                .unwrap()
                .into_utterance()
        };

        assert_eq!(
            parse(r#"{"RecognitionStatus":"Success","DisplayText":"Hola."}"#),
            Utterance::recognized("Hola.")
        );
        assert_eq!(
            parse(r#"{"RecognitionStatus":"InitialSilenceTimeout"}"#),
            Utterance::NoMatch
        );
        assert_eq!(parse(r#"{"RecognitionStatus":"BabbleTimeout"}"#), Utterance::NoMatch);
        assert_eq!(
            parse(r#"{"RecognitionStatus":"Success","DisplayText":"  "}"#),
            Utterance::NoMatch
        );

        match parse(r#"{"RecognitionStatus":"EndOfDictation"}"#) {
            Utterance::Canceled(details) => {
                assert_eq!(details.reason, CancellationReason::EndOfStream)
            },
            other => panic!("unexpected {:?}", other),
        }
        match parse(r#"{"RecognitionStatus":"SomethingNew"}"#) {
            Utterance::Canceled(details) => assert!(details.is_error()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_requires_key_and_host() {
        let source = FakeSource::new(vec![]);
        let mut cfg = config("http://localhost");
        cfg.key = String::new();
        assert!(AzureSpeechRecognizer::new(cfg, source.clone()).is_err());

        let cfg = config("https://{region}.stt.speech.microsoft.com");
        assert!(AzureSpeechRecognizer::new(cfg, source).is_err());
    }

    #[tokio::test]
    async fn test_recognized_utterance_round_trip() {
        let (url, requests) = stub_server(vec![StubResponse::json(
            200,
            r#"{"RecognitionStatus":"Success","DisplayText":"¿Qué hora es?","Offset":0,"Duration":100}"#,
        )])
        .await
        .unwrap();
        let recognizer =
            AzureSpeechRecognizer::new(config(&url), FakeSource::new(vec![Ok(speech())])).unwrap();

        let utterance = recognizer.listen_once().await;
        assert_eq!(utterance, Utterance::recognized("¿Qué hora es?"));

        let requests = requests.lock();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.request_line().starts_with(
            "POST /speech/recognition/conversation/cognitiveservices/v1?language=es-ES&format=simple"
        ));
        assert_eq!(
            request.header("Ocp-Apim-Subscription-Key").as_deref(),
            Some("secret")
        );
        assert_eq!(&request.body[0..4], b"RIFF");
    }

    #[tokio::test]
    async fn test_http_failure_is_canceled_with_error() {
        let (url, _) = stub_server(vec![StubResponse::json(401, r#"{"error":"denied"}"#)])
            .await
            .unwrap();
        let recognizer =
            AzureSpeechRecognizer::new(config(&url), FakeSource::new(vec![Ok(speech())])).unwrap();

        match recognizer.listen_once().await {
            Utterance::Canceled(details) => {
                assert!(details.is_error());
                assert!(details.error_details.as_deref().unwrap_or_default().contains("401"));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silence_and_closed_skip_the_service() {
        let (url, requests) = stub_server(vec![]).await.unwrap();
        let recognizer = AzureSpeechRecognizer::new(
            config(&url),
            FakeSource::new(vec![
                Ok(CapturedAudio::Silence),
                Ok(CapturedAudio::Speech(AudioFrame::new(
                    Vec::new(),
                    SampleRate::Hz16000,
                    0,
                ))),
                Err(PipelineError::Device("unplugged".into())),
            ]),
        )
        .unwrap();

        assert_eq!(recognizer.listen_once().await, Utterance::NoMatch);
        assert_eq!(recognizer.listen_once().await, Utterance::NoMatch);
        match recognizer.listen_once().await {
            Utterance::Canceled(details) => assert!(details.is_error()),
            other => panic!("unexpected {:?}", other),
        }
        match recognizer.listen_once().await {
            Utterance::Canceled(details) => {
                assert_eq!(details.reason, CancellationReason::EndOfStream)
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(requests.lock().is_empty());
    }
}
