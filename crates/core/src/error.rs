//! Error types shared across crates

use thiserror::Error;

/// Unified error for the voice chat crates
///
/// Each backend crate has its own error enum and converts into this one at
/// the port boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Speech recognition error: {0}")]
    Stt(String),

    #[error("Speech synthesis error: {0}")]
    Tts(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors raised while talking to a remote service
    pub fn is_service_error(&self) -> bool {
        matches!(self, Error::Stt(_) | Error::Tts(_) | Error::Llm(_))
    }
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Llm("quota exceeded".to_string());
        assert_eq!(err.to_string(), "LLM error: quota exceeded");
        assert!(err.is_service_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_service_error());
    }
}
