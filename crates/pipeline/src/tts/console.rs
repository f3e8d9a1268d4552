//! Replies printed instead of spoken

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use voice_chat_core::{CancellationDetails, SpeechOutput, SynthesisOutcome};

/// Writes `Assistant: {text}` per reply
pub struct ConsoleSpeechOutput<W = Stdout> {
    writer: Mutex<W>,
}

impl ConsoleSpeechOutput {
    pub fn stdout() -> Self {
        Self::with_writer(tokio::io::stdout())
    }
}

impl<W> ConsoleSpeechOutput<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Hand back the writer (tests read what was printed)
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> SpeechOutput for ConsoleSpeechOutput<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn speak(&self, text: &str) -> SynthesisOutcome {
        let mut writer = self.writer.lock().await;
        let line = format!("Assistant: {}\n", text);

        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;

        match written {
            Ok(()) => SynthesisOutcome::Completed,
            Err(e) => {
                tracing::warn!(error = %e, "Console write failed");
                SynthesisOutcome::Canceled(CancellationDetails::error(e.to_string()))
            },
        }
    }

    fn name(&self) -> &str {
        "console-output"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_is_printed() {
        let output = ConsoleSpeechOutput::with_writer(Vec::<u8>::new());
        assert_eq!(output.speak("Hola, ¿qué tal?").await, SynthesisOutcome::Completed);
        assert_eq!(output.speak("Adiós").await, SynthesisOutcome::Completed);

        let printed = String::from_utf8(output.into_inner()).unwrap();
        assert_eq!(printed, "Assistant: Hola, ¿qué tal?\nAssistant: Adiós\n");
    }
}
