//! Recognition and synthesis results
//!
//! These are the values the speech ports hand back to the orchestrator. Both
//! are produced once per port call and consumed once.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a recognition or synthesis call was canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancellationReason {
    /// The backend reported an error; details are usually attached
    Error,
    /// The audio source ran out of input
    EndOfStream,
    /// Canceled for any other reason
    Other,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CancellationReason::Error => "Error",
            CancellationReason::EndOfStream => "EndOfStream",
            CancellationReason::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Cancellation reason plus an optional backend error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationDetails {
    pub reason: CancellationReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl CancellationDetails {
    /// Canceled because of a backend error
    pub fn error(details: impl Into<String>) -> Self {
        Self {
            reason: CancellationReason::Error,
            error_details: Some(details.into()),
        }
    }

    /// Canceled because the input stream ended
    pub fn end_of_stream() -> Self {
        Self {
            reason: CancellationReason::EndOfStream,
            error_details: None,
        }
    }

    /// Canceled for an unspecified reason
    pub fn other() -> Self {
        Self {
            reason: CancellationReason::Other,
            error_details: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.reason == CancellationReason::Error
    }
}

impl fmt::Display for CancellationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_details.as_deref() {
            Some(details) if self.is_error() => write!(f, "{} ({})", self.reason, details),
            _ => write!(f, "{}", self.reason),
        }
    }
}

/// Result of a single listen call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Utterance {
    /// Speech was recognized into final text
    Recognized { text: String },
    /// Audio was captured but nothing could be recognized
    NoMatch,
    /// Recognition was canceled
    Canceled(CancellationDetails),
}

impl Utterance {
    pub fn recognized(text: impl Into<String>) -> Self {
        Utterance::Recognized { text: text.into() }
    }

    pub fn canceled(details: CancellationDetails) -> Self {
        Utterance::Canceled(details)
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Utterance::Recognized { .. })
    }

    /// Recognized text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Utterance::Recognized { text } => Some(text),
            _ => None,
        }
    }
}

/// Result of a single speak call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    /// Audio was rendered and playback finished
    Completed,
    /// Synthesis or playback was canceled
    Canceled(CancellationDetails),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        assert_eq!(CancellationReason::EndOfStream.to_string(), "EndOfStream");
        assert_eq!(CancellationReason::Error.to_string(), "Error");
    }

    #[test]
    fn test_details_shown_only_for_errors() {
        let err = CancellationDetails::error("401 Unauthorized");
        assert_eq!(err.to_string(), "Error (401 Unauthorized)");

        let other = CancellationDetails {
            reason: CancellationReason::Other,
            error_details: Some("ignored".to_string()),
        };
        assert_eq!(other.to_string(), "Other");
    }

    #[test]
    fn test_utterance_text() {
        assert_eq!(Utterance::recognized("Hello").text(), Some("Hello"));
        assert_eq!(Utterance::NoMatch.text(), None);
        assert!(!Utterance::canceled(CancellationDetails::end_of_stream()).is_recognized());
    }

    #[test]
    fn test_utterance_serde_tag() {
        let json = serde_json::to_value(Utterance::recognized("Hola")).unwrap();
        assert_eq!(json["kind"], "recognized");
        assert_eq!(json["text"], "Hola");
    }
}
