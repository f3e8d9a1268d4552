//! Energy-based utterance endpointing
//!
//! Blocks are classified as speech when their RMS energy is above the
//! threshold. Timing is measured in audio time (sample counts), not wall
//! clock, so the detector behaves the same on any device.

use voice_chat_config::AudioConfig;
use voice_chat_core::AudioFrame;

/// Endpointing thresholds
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Energy above which a block counts as speech (dBFS)
    pub energy_threshold_db: f32,
    /// Give up if no speech starts within this time
    pub initial_silence_timeout_ms: u64,
    /// Trailing silence that closes the utterance
    pub end_silence_ms: u64,
    /// Hard cap on utterance length
    pub max_utterance_ms: u64,
    /// Speech shorter than this is treated as a click and ignored
    pub min_speech_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::from(&AudioConfig::default())
    }
}

impl From<&AudioConfig> for EndpointConfig {
    fn from(config: &AudioConfig) -> Self {
        Self {
            energy_threshold_db: config.energy_threshold_db,
            initial_silence_timeout_ms: config.initial_silence_timeout_ms,
            end_silence_ms: config.end_silence_ms,
            max_utterance_ms: config.max_utterance_ms,
            min_speech_ms: 100,
        }
    }
}

/// What the detector decided after a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointEvent {
    /// Keep feeding blocks
    Continue,
    /// Utterance finished; take it with [`UtteranceDetector::take_utterance`]
    Complete,
    /// No speech before the initial-silence timeout
    NoSpeech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    InSpeech,
    Done,
}

/// Collects blocks until one utterance has been endpointed
pub struct UtteranceDetector {
    config: EndpointConfig,
    phase: Phase,
    waited_us: u64,
    speech_us: u64,
    trailing_silence_us: u64,
    voiced_us: u64,
    /// Short lead-in kept while waiting so the first syllable is not clipped
    pre_roll: Vec<AudioFrame>,
    frames: Vec<AudioFrame>,
}

const PRE_ROLL_US: u64 = 200_000;

fn micros(frame: &AudioFrame) -> u64 {
    frame.duration.as_micros() as u64
}

fn ms_to_us(ms: u64) -> u64 {
    ms.saturating_mul(1000)
}

impl UtteranceDetector {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            phase: Phase::Waiting,
            waited_us: 0,
            speech_us: 0,
            trailing_silence_us: 0,
            voiced_us: 0,
            pre_roll: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Feed one captured block
    pub fn push(&mut self, frame: AudioFrame) -> EndpointEvent {
        let frame_us = micros(&frame);
        let voiced = !frame.is_likely_silence(self.config.energy_threshold_db);

        match self.phase {
            Phase::Done => EndpointEvent::Complete,
            Phase::Waiting => {
                if voiced {
                    self.phase = Phase::InSpeech;
                    self.frames.append(&mut self.pre_roll);
                    self.speech_us = frame_us;
                    self.voiced_us = frame_us;
                    self.trailing_silence_us = 0;
                    self.frames.push(frame);
                    return EndpointEvent::Continue;
                }

                self.waited_us += frame_us;
                self.pre_roll.push(frame);
                let mut kept_us: u64 = self.pre_roll.iter().map(micros).sum();
                while kept_us > PRE_ROLL_US && self.pre_roll.len() > 1 {
                    let dropped = self.pre_roll.remove(0);
                    kept_us -= micros(&dropped);
                }

                if self.waited_us >= ms_to_us(self.config.initial_silence_timeout_ms) {
                    self.phase = Phase::Done;
                    self.pre_roll.clear();
                    EndpointEvent::NoSpeech
                } else {
                    EndpointEvent::Continue
                }
            },
            Phase::InSpeech => {
                self.speech_us += frame_us;
                if voiced {
                    self.voiced_us += frame_us;
                    self.trailing_silence_us = 0;
                } else {
                    self.trailing_silence_us += frame_us;
                }
                self.frames.push(frame);

                if self.trailing_silence_us >= ms_to_us(self.config.end_silence_ms) {
                    if self.voiced_us < ms_to_us(self.config.min_speech_ms) {
                        // A click, not speech: go back to waiting
                        self.reset_speech();
                        return EndpointEvent::Continue;
                    }
                    self.phase = Phase::Done;
                    return EndpointEvent::Complete;
                }

                if self.speech_us >= ms_to_us(self.config.max_utterance_ms) {
                    self.phase = Phase::Done;
                    return EndpointEvent::Complete;
                }

                EndpointEvent::Continue
            },
        }
    }

    fn reset_speech(&mut self) {
        self.waited_us += self.speech_us;
        self.phase = Phase::Waiting;
        self.speech_us = 0;
        self.voiced_us = 0;
        self.trailing_silence_us = 0;
        self.frames.clear();
    }

    /// Whether speech has started
    pub fn in_speech(&self) -> bool {
        self.phase == Phase::InSpeech
    }

    /// Captured utterance frames, leaving the detector ready for reuse
    pub fn take_utterance(&mut self) -> Vec<AudioFrame> {
        let frames = std::mem::take(&mut self.frames);
        self.reset();
        frames
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Waiting;
        self.waited_us = 0;
        self.speech_us = 0;
        self.trailing_silence_us = 0;
        self.voiced_us = 0;
        self.pre_roll.clear();
        self.frames.clear();
    }
}
