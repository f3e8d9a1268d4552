//! Typed input standing in for the microphone

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::{watch, Mutex};
use voice_chat_core::{CancellationDetails, SpeechInput, Utterance};

/// Reads one line per utterance
///
/// A blank line is a no-match and end of input cancels with
/// `EndOfStream`. When a shutdown sender is attached, end of input also
/// raises it so the loop stops instead of spinning on a closed reader.
/// A pending read is abandoned (canceled with `Other`) once the cancel
/// receiver flips to `true`.
pub struct ConsoleSpeechInput<R = BufReader<Stdin>> {
    reader: Mutex<R>,
    shutdown_on_eof: Option<Arc<watch::Sender<bool>>>,
    cancel: Option<watch::Receiver<bool>>,
}

impl ConsoleSpeechInput {
    /// Read from the process's standard input
    pub fn stdin() -> Self {
        Self::with_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> ConsoleSpeechInput<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn with_reader(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
            shutdown_on_eof: None,
            cancel: None,
        }
    }

    /// Stop waiting for a line once `cancel` becomes `true`
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Raise `shutdown` once the reader is exhausted
    pub fn with_shutdown_on_eof(mut self, shutdown: Arc<watch::Sender<bool>>) -> Self {
        self.shutdown_on_eof = Some(shutdown);
        self
    }
}

#[async_trait]
impl<R> SpeechInput for ConsoleSpeechInput<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn listen_once(&self) -> Utterance {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();

        let read = reader.read_line(&mut line);
        let result = match self.cancel.clone() {
            Some(mut cancel) => tokio::select! {
                result = read => result,
                Ok(_) = cancel.wait_for(|stop| *stop) => {
                    tracing::debug!("Console read abandoned on shutdown");
                    return Utterance::canceled(CancellationDetails::other());
                },
            },
            None => read.await,
        };

        match result {
            Ok(0) => {
                tracing::debug!("Console input closed");
                if let Some(shutdown) = &self.shutdown_on_eof {
                    shutdown.send_replace(true);
                }
                Utterance::canceled(CancellationDetails::end_of_stream())
            },
            Ok(_) => {
                let text = line.trim();
                if text.is_empty() {
                    Utterance::NoMatch
                } else {
                    Utterance::recognized(text)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Console read failed");
                Utterance::canceled(CancellationDetails::error(e.to_string()))
            },
        }
    }

    fn name(&self) -> &str {
        "console-input"
    }
}
