//! WAV encoding for recognition uploads and decoding of synthesized audio

use std::io::Cursor;

use voice_chat_core::{AudioFrame, SampleRate};

use crate::PipelineError;

/// Encode a mono frame as a 16-bit PCM WAV file
pub fn encode_wav(frame: &AudioFrame) -> Result<Vec<u8>, PipelineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: frame.sample_rate.as_u32(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + frame.samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in frame.to_i16() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Decode a WAV payload into a mono frame
///
/// Multi-channel audio is averaged down to mono. Rates outside
/// [`SampleRate`] are resampled linearly to 24kHz.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioFrame, PipelineError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        },
    };

    let mono: Vec<f32> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    match SampleRate::from_hz(spec.sample_rate) {
        Some(rate) => Ok(AudioFrame::new(mono, rate, 0)),
        None => {
            let target = SampleRate::Hz24000;
            Ok(AudioFrame::new(
                resample_linear(&mono, spec.sample_rate, target.as_u32()),
                target,
                0,
            ))
        },
    }
}

fn resample_linear(samples: &[f32], from_hz: u32, to_hz: u32) -> Vec<f32> {
    if samples.is_empty() || from_hz == 0 {
        return Vec::new();
    }
    let ratio = from_hz as f64 / to_hz as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_riff_header() {
        let frame = AudioFrame::new(vec![0.25; 160], SampleRate::Hz16000, 0);
        let bytes = encode_wav(&frame).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 320);
    }

    #[test]
    fn test_decode_stereo_downmixes() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 24000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(16384i16).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let frame = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(frame.sample_rate, SampleRate::Hz24000);
        assert_eq!(frame.samples.len(), 100);
        assert!((frame.samples[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decode_unusual_rate_is_resampled() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 12000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..1200 {
                writer.write_sample(1000i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let frame = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(frame.sample_rate, SampleRate::Hz24000);
        assert_eq!(frame.samples.len(), 2400);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_wav(b"not a wav"), Err(PipelineError::Wav(_))));
    }
}
