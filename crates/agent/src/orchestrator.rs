//! Conversation orchestrator
//!
//! ```text
//! Listening ──▶ Classifying ──▶ Querying ──▶ Synthesizing ──┐
//!     ▲             │  │                                     │
//!     │             │  └──▶ Ended (stop phrase)              │
//!     └─────────────┴────────────────────────────────────────┘
//!       (no match, canceled input, failed query, finished turn)
//! ```
//!
//! Exactly one port call is in flight at a time. Per-turn failures are
//! reported and swallowed; only the stop phrase or a shutdown request ends
//! the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use voice_chat_config::constants::conversation;
use voice_chat_config::ConversationConfig;
use voice_chat_core::{
    CancellationDetails, CancellationReason, ConversationTurn, LanguageModel, SpeechInput,
    SpeechOutput, SynthesisOutcome, Utterance,
};

use crate::stop_phrase::StopPhrase;
use crate::transcript::{ConsoleTranscript, Transcript};
use crate::AgentError;

const LISTENING_BANNER: &str =
    "Azure OpenAI is listening. Say 'Stop' or press Ctrl-C to end the conversation.";
const ENDED_LINE: &str = "Conversation ended.";

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Utterance that ends the conversation
    pub stop_phrase: String,
    /// System prompt sent with every user utterance
    pub system_prompt: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stop_phrase: conversation::STOP_PHRASE.to_string(),
            system_prompt: conversation::SYSTEM_PROMPT.to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(config: &ConversationConfig) -> Self {
        Self {
            stop_phrase: config.stop_phrase.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.stop_phrase.trim().is_empty() {
            return Err(AgentError::Configuration(
                "stop phrase must not be blank".into(),
            ));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(AgentError::Configuration(
                "system prompt must not be blank".into(),
            ));
        }
        Ok(())
    }
}

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Listening,
    Classifying,
    Querying,
    Synthesizing,
    Ended,
}

/// Mutable loop state; once `conversation_ended` is set no turn starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopState {
    pub conversation_ended: bool,
}

/// How one turn finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Reply generated and played
    Spoken,
    /// Reply generated but synthesis was canceled
    SynthesisCanceled,
    /// Nothing recognized
    NoMatch,
    /// Recognition canceled (error, end of stream, other)
    InputCanceled,
    /// Model failed or returned an empty reply; nothing was spoken
    QueryFailed,
    /// Stop phrase heard, or the conversation had already ended
    Ended,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Spoken => "spoken",
            TurnOutcome::SynthesisCanceled => "synthesis_canceled",
            TurnOutcome::NoMatch => "no_match",
            TurnOutcome::InputCanceled => "input_canceled",
            TurnOutcome::QueryFailed => "query_failed",
            TurnOutcome::Ended => "ended",
        }
    }
}

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopExit {
    StopPhrase,
    Shutdown,
}

/// Broadcast once per transition
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    StateChanged {
        old: OrchestratorState,
        new: OrchestratorState,
    },
    Recognized {
        text: String,
    },
    NoMatch,
    InputCanceled {
        details: CancellationDetails,
    },
    Reply {
        text: String,
    },
    QueryFailed {
        error: String,
    },
    Spoken {
        text: String,
    },
    SynthesisCanceled {
        details: CancellationDetails,
    },
    Ended {
        exit: LoopExit,
    },
}

/// Sequential listen / query / speak loop over three ports
///
/// The ports are held for the orchestrator's lifetime and released when it
/// is dropped.
pub struct ConversationOrchestrator {
    input: Arc<dyn SpeechInput>,
    llm: Arc<dyn LanguageModel>,
    output: Arc<dyn SpeechOutput>,
    config: OrchestratorConfig,
    stop_phrase: StopPhrase,
    state: Mutex<OrchestratorState>,
    loop_state: Mutex<LoopState>,
    turns_completed: AtomicU64,
    transcript: Arc<dyn Transcript>,
    event_tx: broadcast::Sender<ConversationEvent>,
}

impl ConversationOrchestrator {
    pub fn new(
        input: Arc<dyn SpeechInput>,
        llm: Arc<dyn LanguageModel>,
        output: Arc<dyn SpeechOutput>,
        config: OrchestratorConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let stop_phrase = StopPhrase::new(config.stop_phrase.clone());

        tracing::debug!(
            input = input.name(),
            model = llm.model_name(),
            output = output.name(),
            stop_phrase = %stop_phrase.as_str(),
            "Conversation orchestrator created"
        );

        Self {
            input,
            llm,
            output,
            config,
            stop_phrase,
            state: Mutex::new(OrchestratorState::Listening),
            loop_state: Mutex::new(LoopState::default()),
            turns_completed: AtomicU64::new(0),
            transcript: Arc::new(ConsoleTranscript),
            event_tx,
        }
    }

    /// Send transcript lines somewhere other than stdout
    pub fn with_transcript(mut self, transcript: Arc<dyn Transcript>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock()
    }

    pub fn loop_state(&self) -> LoopState {
        *self.loop_state.lock()
    }

    /// Recognized, non-stop utterances that went on to the model
    pub fn turns_completed(&self) -> u64 {
        self.turns_completed.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run turns until the stop phrase or a shutdown request
    ///
    /// `shutdown` is only looked at before a turn starts. A request raised
    /// while a port call is in flight lets the current turn finish.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> LoopExit {
        tracing::info!("Conversation started");

        loop {
            if self.loop_state().conversation_ended {
                return LoopExit::StopPhrase;
            }

            if *shutdown.borrow() {
                tracing::info!(
                    turns = self.turns_completed(),
                    "Shutdown requested, ending conversation"
                );
                self.end(LoopExit::Shutdown);
                return LoopExit::Shutdown;
            }

            if self.run_turn().await == TurnOutcome::Ended {
                tracing::info!(turns = self.turns_completed(), "Stop phrase heard");
                return LoopExit::StopPhrase;
            }
        }
    }

    /// Run exactly one turn
    pub async fn run_turn(&self) -> TurnOutcome {
        if self.loop_state().conversation_ended {
            return TurnOutcome::Ended;
        }

        let outcome = self.turn().await;
        metrics::counter!("voice_chat_turns_total", "outcome" => outcome.as_str()).increment(1);

        if outcome != TurnOutcome::Ended {
            self.set_state(OrchestratorState::Listening);
        }
        outcome
    }

    async fn turn(&self) -> TurnOutcome {
        self.set_state(OrchestratorState::Listening);
        self.transcript.line(LISTENING_BANNER);

        let utterance = self.input.listen_once().await;

        self.set_state(OrchestratorState::Classifying);
        let text = match utterance {
            Utterance::Recognized { text } => text,
            Utterance::NoMatch => {
                tracing::debug!("No speech recognized");
                self.transcript.line("No speech could be recognized");
                self.emit(ConversationEvent::NoMatch);
                return TurnOutcome::NoMatch;
            },
            Utterance::Canceled(details) => {
                self.report_input_canceled(&details);
                self.emit(ConversationEvent::InputCanceled { details });
                return TurnOutcome::InputCanceled;
            },
        };

        if self.stop_phrase.matches(&text) {
            self.end(LoopExit::StopPhrase);
            return TurnOutcome::Ended;
        }

        tracing::info!(text = %text, "Recognized speech");
        self.transcript.line(&format!("Recognized speech: {}", text));
        self.emit(ConversationEvent::Recognized { text: text.clone() });
        self.turns_completed.fetch_add(1, Ordering::Relaxed);

        self.set_state(OrchestratorState::Querying);
        let mut turn = ConversationTurn::new(text, self.config.system_prompt.clone());
        let started = Instant::now();

        let completion = self.llm.complete(&turn.system_prompt, &turn.user_text).await;
        match completion {
            Ok(reply) => turn.set_reply(reply),
            Err(e) => {
                self.report_query_failed(e.to_string());
                return TurnOutcome::QueryFailed;
            },
        }
        metrics::histogram!("voice_chat_llm_latency_seconds")
            .record(started.elapsed().as_secs_f64());

        if !turn.has_reply() {
            self.report_query_failed("Model returned an empty reply".to_string());
            return TurnOutcome::QueryFailed;
        }

        tracing::info!(
            reply_chars = turn.reply.chars().count(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Model replied"
        );
        self.transcript
            .line(&format!("Azure OpenAI response: {}", turn.reply));
        self.emit(ConversationEvent::Reply {
            text: turn.reply.clone(),
        });

        self.set_state(OrchestratorState::Synthesizing);
        match self.output.speak(&turn.reply).await {
            SynthesisOutcome::Completed => {
                self.transcript.line(&format!(
                    "Speech synthesized to speaker for text: [{}]",
                    turn.reply
                ));
                self.emit(ConversationEvent::Spoken { text: turn.reply });
                TurnOutcome::Spoken
            },
            SynthesisOutcome::Canceled(details) => {
                tracing::warn!(reason = %details.reason, "Speech synthesis canceled");
                self.transcript
                    .line(&format!("Speech synthesis canceled: {}", details.reason));
                if details.reason == CancellationReason::Error {
                    self.transcript.line(&format!(
                        "Error details: {}",
                        details.error_details.as_deref().unwrap_or_default()
                    ));
                }
                self.emit(ConversationEvent::SynthesisCanceled { details });
                TurnOutcome::SynthesisCanceled
            },
        }
    }

    fn report_input_canceled(&self, details: &CancellationDetails) {
        match details.reason {
            CancellationReason::Error => tracing::warn!(
                reason = %details.reason,
                detail = details.error_details.as_deref().unwrap_or_default(),
                "Speech recognition canceled"
            ),
            _ => tracing::info!(reason = %details.reason, "Speech recognition canceled"),
        }

        self.transcript
            .line(&format!("Speech Recognition canceled: {}", details.reason));
        if details.reason == CancellationReason::Error {
            self.transcript.line(&format!(
                "Error details={}",
                details.error_details.as_deref().unwrap_or_default()
            ));
        }
    }

    fn report_query_failed(&self, error: String) {
        metrics::counter!("voice_chat_llm_failures_total").increment(1);
        tracing::warn!(error = %error, "Language model query failed, abandoning turn");
        self.transcript
            .line(&format!("Azure OpenAI request failed: {}", error));
        self.emit(ConversationEvent::QueryFailed { error });
    }

    fn end(&self, exit: LoopExit) {
        self.loop_state.lock().conversation_ended = true;
        self.set_state(OrchestratorState::Ended);
        self.transcript.line(ENDED_LINE);
        self.emit(ConversationEvent::Ended { exit });
    }

    fn set_state(&self, new: OrchestratorState) {
        let old = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, new)
        };
        if old != new {
            tracing::trace!(?old, ?new, "State transition");
            self.emit(ConversationEvent::StateChanged { old, new });
        }
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
