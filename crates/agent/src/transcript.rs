//! Human-readable conversation lines
//!
//! The loop reports each transition as one line of text. In the binary these
//! go to stdout (tracing owns stderr); tests capture or discard them.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Destination for transcript lines
pub trait Transcript: Send + Sync + 'static {
    fn line(&self, line: &str);
}

/// Writes to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTranscript;

impl Transcript for ConsoleTranscript {
    fn line(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout must not take the conversation down with it
        if writeln!(stdout, "{}", line).and_then(|_| stdout.flush()).is_err() {
            tracing::debug!("Transcript line dropped: stdout unavailable");
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentTranscript;

impl Transcript for SilentTranscript {
    fn line(&self, _line: &str) {}
}

/// Keeps lines in memory; clones share the same buffer
#[derive(Debug, Default, Clone)]
pub struct CapturedTranscript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.lock().iter().any(|l| l == line)
    }

    pub fn last(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }
}

impl Transcript for CapturedTranscript {
    fn line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_lines_are_shared_between_clones() {
        let transcript = CapturedTranscript::new();
        let sink: Arc<dyn Transcript> = Arc::new(transcript.clone());
        sink.line("Recognized speech: Hola");
        sink.line("Conversation ended.");

        assert_eq!(transcript.lines().len(), 2);
        assert!(transcript.contains("Recognized speech: Hola"));
        assert_eq!(transcript.last().as_deref(), Some("Conversation ended."));
    }
}
