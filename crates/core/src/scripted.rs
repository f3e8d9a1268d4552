//! Scripted port implementations
//!
//! Deterministic stand-ins for the three ports. They share a [`CallLog`] so a
//! test can assert the exact interleaving of listen / complete / speak calls.

use crate::llm_types::{GenerateRequest, GenerateResponse};
use crate::traits::{LanguageModel, SpeechInput, SpeechOutput};
use crate::utterance::{CancellationDetails, SynthesisOutcome, Utterance};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One recorded port invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    Listen,
    Complete(String),
    Speak(String),
}

/// Shared, ordered record of port calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<PortCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: PortCall) {
        self.calls.lock().push(call);
    }

    /// Snapshot of all calls so far
    pub fn calls(&self) -> Vec<PortCall> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn count_listens(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PortCall::Listen))
            .count()
    }

    pub fn count_completions(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PortCall::Complete(_)))
            .count()
    }

    pub fn count_speaks(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PortCall::Speak(_)))
            .count()
    }
}

/// Returns queued utterances in order, then `Canceled(EndOfStream)` forever
pub struct ScriptedSpeechInput {
    queue: Mutex<VecDeque<Utterance>>,
    log: CallLog,
}

impl ScriptedSpeechInput {
    pub fn new(utterances: impl IntoIterator<Item = Utterance>) -> Self {
        Self {
            queue: Mutex::new(utterances.into_iter().collect()),
            log: CallLog::new(),
        }
    }

    /// Record calls into a shared log
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

#[async_trait]
impl SpeechInput for ScriptedSpeechInput {
    async fn listen_once(&self) -> Utterance {
        self.log.record(PortCall::Listen);
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Utterance::Canceled(CancellationDetails::end_of_stream()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Answers user text from a lookup table
///
/// Texts without an entry get the default reply. A failure entry produces
/// `Error::Llm`.
pub struct ScriptedLanguageModel {
    replies: HashMap<String, std::result::Result<String, String>>,
    default_reply: String,
    log: CallLog,
}

impl Default for ScriptedLanguageModel {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            default_reply: "OK".to_string(),
            log: CallLog::new(),
        }
    }
}

impl ScriptedLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, user_text: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(user_text.into(), Ok(reply.into()));
        self
    }

    pub fn with_failure(mut self, user_text: impl Into<String>, error: impl Into<String>) -> Self {
        self.replies.insert(user_text.into(), Err(error.into()));
        self
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let user_text = request.user_text().unwrap_or_default().to_string();
        self.log.record(PortCall::Complete(user_text.clone()));

        match self.replies.get(&user_text) {
            Some(Ok(reply)) => Ok(GenerateResponse::text(reply.clone())),
            Some(Err(error)) => Err(Error::Llm(error.clone())),
            None => Ok(GenerateResponse::text(self.default_reply.clone())),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Returns queued synthesis outcomes, then `Completed`
#[derive(Default)]
pub struct ScriptedSpeechOutput {
    outcomes: Mutex<VecDeque<SynthesisOutcome>>,
    log: CallLog,
}

impl ScriptedSpeechOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = SynthesisOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            log: CallLog::new(),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

#[async_trait]
impl SpeechOutput for ScriptedSpeechOutput {
    async fn speak(&self, text: &str) -> SynthesisOutcome {
        self.log.record(PortCall::Speak(text.to_string()));
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or(SynthesisOutcome::Completed)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
