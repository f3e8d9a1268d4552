//! Stop-phrase matching

/// The phrase that ends the conversation
///
/// Matching is exact after trimming surrounding whitespace and lowercasing
/// both sides. There is no fuzzy matching: "Stop" does not match "Stop.".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopPhrase {
    phrase: String,
    normalized: String,
}

impl StopPhrase {
    pub fn new(phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        let normalized = normalize(&phrase);
        Self { phrase, normalized }
    }

    /// Phrase as configured
    pub fn as_str(&self) -> &str {
        &self.phrase
    }

    /// A blank phrase can never be said
    pub fn is_blank(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        !self.is_blank() && normalize(text) == self.normalized
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_exact_match() {
        let stop = StopPhrase::new("Stop.");
        assert!(stop.matches("Stop."));
        assert!(stop.matches("stop."));
        assert!(stop.matches("STOP."));
        assert!(stop.matches("  Stop.\n"));
    }

    #[test]
    fn test_near_misses_do_not_match() {
        let stop = StopPhrase::new("Stop.");
        assert!(!stop.matches("Stop"));
        assert!(!stop.matches("Stop it."));
        assert!(!stop.matches("Don't stop."));
        assert!(!stop.matches(""));
    }

    #[test]
    fn test_unicode_case_folding() {
        let stop = StopPhrase::new("¡Basta Ya!");
        assert!(stop.matches("¡basta ya!"));
        let stop = StopPhrase::new("ÁDIOS");
        assert!(stop.matches("ádios"));
    }

    #[test]
    fn test_blank_phrase_never_matches() {
        let stop = StopPhrase::new("   ");
        assert!(stop.is_blank());
        assert!(!stop.matches(""));
        assert!(!stop.matches("   "));
    }
}
