//! Audio frame types and utilities
//!
//! All frames are mono. Capture devices are down-mixed before frames are
//! built, and synthesized audio is decoded to mono.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Minimum dB reported for digital silence
const SILENCE_FLOOR_DB: f32 = -96.0;

/// Samples per resampler block
const RESAMPLE_CHUNK: usize = 1024;

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - Telephony
    Hz8000,
    /// 16kHz - Speech recognition upload format
    #[default]
    Hz16000,
    /// 22.05kHz
    Hz22050,
    /// 24kHz - Synthesis output format
    Hz24000,
    /// 44.1kHz - Common device rate
    Hz44100,
    /// 48kHz - Common device rate
    Hz48000,
}

impl SampleRate {
    /// Get sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz22050 => 22050,
            SampleRate::Hz24000 => 24000,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
        }
    }

    /// Map a raw rate in Hz onto a supported rate
    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            8000 => Some(SampleRate::Hz8000),
            16000 => Some(SampleRate::Hz16000),
            22050 => Some(SampleRate::Hz22050),
            24000 => Some(SampleRate::Hz24000),
            44100 => Some(SampleRate::Hz44100),
            48000 => Some(SampleRate::Hz48000),
            _ => None,
        }
    }

    /// Number of samples covering `ms` milliseconds
    pub fn samples_for_ms(&self, ms: u64) -> usize {
        (self.as_u32() as u64 * ms / 1000) as usize
    }
}

/// Mono audio frame
#[derive(Clone)]
pub struct AudioFrame {
    /// Raw audio samples (f32, normalized to [-1.0, 1.0])
    pub samples: Arc<[f32]>,
    /// Sample rate
    pub sample_rate: SampleRate,
    /// Frame sequence number for ordering
    pub sequence: u64,
    /// Duration of this frame
    pub duration: Duration,
    /// RMS energy in dBFS
    pub energy_db: f32,
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("samples_len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("sequence", &self.sequence)
            .field("duration", &self.duration)
            .field("energy_db", &self.energy_db)
            .finish()
    }
}

impl AudioFrame {
    /// Create a new audio frame from f32 samples
    pub fn new(samples: Vec<f32>, sample_rate: SampleRate, sequence: u64) -> Self {
        let duration =
            Duration::from_secs_f64(samples.len() as f64 / sample_rate.as_u32() as f64);
        let energy_db = Self::calculate_energy_db(&samples);

        Self {
            samples: samples.into(),
            sample_rate,
            sequence,
            duration,
            energy_db,
        }
    }

    /// Join consecutive frames into one, resampling where rates differ
    pub fn concat(frames: &[AudioFrame], sample_rate: SampleRate) -> Self {
        let total: usize = frames.iter().map(|f| f.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);
        for frame in frames {
            if frame.sample_rate == sample_rate {
                samples.extend_from_slice(&frame.samples);
            } else {
                samples.extend_from_slice(&frame.resample(sample_rate).samples);
            }
        }
        let sequence = frames.first().map(|f| f.sequence).unwrap_or(0);
        Self::new(samples, sample_rate, sequence)
    }

    /// Calculate RMS energy in decibels
    fn calculate_energy_db(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return SILENCE_FLOOR_DB;
        }

        let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
        let rms = (sum_squares / samples.len() as f32).sqrt();

        if rms > 0.0 {
            (20.0 * rms.log10()).max(SILENCE_FLOOR_DB)
        } else {
            SILENCE_FLOOR_DB
        }
    }

    /// Convert from PCM16 bytes (little-endian)
    pub fn from_pcm16(bytes: &[u8], sample_rate: SampleRate, sequence: u64) -> Self {
        const PCM16_NORMALIZE: f32 = 32768.0;

        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / PCM16_NORMALIZE)
            .collect();

        Self::new(samples, sample_rate, sequence)
    }

    /// Samples as clamped i16 values
    pub fn to_i16(&self) -> Vec<i16> {
        const PCM16_SCALE: f32 = 32767.0;

        self.samples
            .iter()
            .map(|&sample| (sample.clamp(-1.0, 1.0) * PCM16_SCALE) as i16)
            .collect()
    }

    /// Convert to PCM16 bytes (little-endian)
    pub fn to_pcm16(&self) -> Vec<u8> {
        self.to_i16()
            .into_iter()
            .flat_map(|sample| sample.to_le_bytes())
            .collect()
    }

    /// Resample with Rubato, block by block over the whole frame
    ///
    /// Falls back to linear interpolation for very short frames or if Rubato
    /// rejects the conversion.
    pub fn resample(&self, target_rate: SampleRate) -> Self {
        if self.sample_rate == target_rate {
            return self.clone();
        }

        if self.samples.len() < 64 {
            return self.resample_linear(target_rate);
        }

        match self.resample_fft(target_rate) {
            Ok(resampled) => Self::new(resampled, target_rate, self.sequence),
            Err(e) => {
                tracing::warn!("Rubato resampling failed, using linear fallback: {}", e);
                self.resample_linear(target_rate)
            },
        }
    }

    fn resample_fft(
        &self,
        target_rate: SampleRate,
    ) -> std::result::Result<Vec<f32>, Box<dyn std::error::Error>> {
        use rubato::{FftFixedIn, Resampler};

        let input: Vec<f64> = self.samples.iter().map(|&s| s as f64).collect();
        let mut resampler = FftFixedIn::<f64>::new(
            self.sample_rate.as_u32() as usize,
            target_rate.as_u32() as usize,
            RESAMPLE_CHUNK,
            2,
            1,
        )?;

        let expected = (input.len() as u64 * target_rate.as_u32() as u64
            / self.sample_rate.as_u32() as u64) as usize;
        let delay = resampler.output_delay();
        let mut output = Vec::with_capacity(delay + expected + RESAMPLE_CHUNK);
        let mut pos = 0;

        while pos + resampler.input_frames_next() <= input.len() {
            let needed = resampler.input_frames_next();
            let wave: [&[f64]; 1] = [&input[pos..pos + needed]];
            let block = resampler.process(&wave[..], None)?;
            output.extend(block[0].iter().map(|&s| s as f32));
            pos += needed;
        }

        if pos < input.len() {
            let wave: [&[f64]; 1] = [&input[pos..]];
            let block = resampler.process_partial(Some(&wave[..]), None)?;
            output.extend(block[0].iter().map(|&s| s as f32));
        }

        // Flush the filter tail that is still buffered
        while output.len() < delay + expected {
            let block = resampler.process_partial(None::<&[Vec<f64>]>, None)?;
            if block[0].is_empty() {
                break;
            }
            output.extend(block[0].iter().map(|&s| s as f32));
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected);
        Ok(output)
    }

    /// Linear interpolation fallback for edge cases
    fn resample_linear(&self, target_rate: SampleRate) -> Self {
        let ratio = target_rate.as_u32() as f64 / self.sample_rate.as_u32() as f64;
        let new_len = (self.samples.len() as f64 * ratio) as usize;

        let mut resampled = Vec::with_capacity(new_len);
        for i in 0..new_len {
            let src_idx = i as f64 / ratio;
            let idx_floor = (src_idx.floor() as usize).min(self.samples.len().saturating_sub(1));
            let idx_ceil = (idx_floor + 1).min(self.samples.len().saturating_sub(1));
            let frac = (src_idx - idx_floor as f64) as f32;

            resampled
                .push(self.samples[idx_floor] * (1.0 - frac) + self.samples[idx_ceil] * frac);
        }

        Self::new(resampled, target_rate, self.sequence)
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// Check if frame is likely silence based on energy
    pub fn is_likely_silence(&self, threshold_db: f32) -> bool {
        self.energy_db < threshold_db
    }

    /// Whether the frame carries no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
