//! Speech port traits

use crate::utterance::{SynthesisOutcome, Utterance};
use async_trait::async_trait;

/// Source of classified utterances
///
/// Implementations:
/// - `AzureSpeechRecognizer` - microphone capture + Azure Speech recognition
/// - `ConsoleSpeechInput` - one line of stdin per utterance
/// - `ScriptedSpeechInput` - queued utterances for tests
///
/// # Example
///
/// ```ignore
/// let input: Arc<dyn SpeechInput> = Arc::new(ConsoleSpeechInput::new());
/// match input.listen_once().await {
///     Utterance::Recognized { text } => println!("Heard: {}", text),
///     other => println!("Nothing usable: {:?}", other),
/// }
/// ```
#[async_trait]
pub trait SpeechInput: Send + Sync + 'static {
    /// Capture and classify exactly one utterance
    ///
    /// Never returns partial results. Failures are reported as
    /// `Utterance::Canceled` with a reason rather than as errors, so that
    /// they stay distinct from a plain no-match.
    async fn listen_once(&self) -> Utterance;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Sink that renders reply text as audio
///
/// Implementations:
/// - `AzureSpeechSynthesizer` - Azure Speech synthesis + speaker playback
/// - `ConsoleSpeechOutput` - prints the reply
/// - `ScriptedSpeechOutput` - queued outcomes for tests
#[async_trait]
pub trait SpeechOutput: Send + Sync + 'static {
    /// Render `text` and wait until playback finishes or is canceled
    async fn speak(&self, text: &str) -> SynthesisOutcome;

    /// Backend name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utterance::CancellationDetails;

    struct EchoInput;

    #[async_trait]
    impl SpeechInput for EchoInput {
        async fn listen_once(&self) -> Utterance {
            Utterance::recognized("echo")
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct MuteOutput;

    #[async_trait]
    impl SpeechOutput for MuteOutput {
        async fn speak(&self, _text: &str) -> SynthesisOutcome {
            SynthesisOutcome::Canceled(CancellationDetails::other())
        }

        fn name(&self) -> &str {
            "mute"
        }
    }

    #[tokio::test]
    async fn test_ports_are_object_safe() {
        let input: Box<dyn SpeechInput> = Box::new(EchoInput);
        let output: Box<dyn SpeechOutput> = Box::new(MuteOutput);

        assert_eq!(input.listen_once().await.text(), Some("echo"));
        assert!(matches!(
            output.speak("hi").await,
            SynthesisOutcome::Canceled(_)
        ));
        assert_eq!(output.name(), "mute");
    }
}
