//! Microphone capture on the default input device

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use tokio::sync::{mpsc, Mutex};
use voice_chat_core::{AudioFrame, SampleRate};

use super::{AudioSource, CapturedAudio, EndpointConfig, EndpointEvent, UtteranceDetector};
use crate::PipelineError;

/// Blocks buffered between the device callback and the endpointer
const BLOCK_QUEUE: usize = 512;

/// Default microphone, endpointed into utterances
///
/// The cpal stream lives on its own thread for the lifetime of this value;
/// dropping it stops the stream and releases the device.
pub struct MicrophoneCapture {
    blocks: Mutex<mpsc::Receiver<Vec<f32>>>,
    device_rate: SampleRate,
    upload_rate: SampleRate,
    endpoint: EndpointConfig,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneCapture {
    /// Open the default input device
    pub fn open(endpoint: EndpointConfig, upload_rate: SampleRate) -> Result<Self, PipelineError> {
        let (block_tx, block_rx) = mpsc::channel(BLOCK_QUEUE);
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let stream = match open_input_stream(block_tx) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    },
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    },
                };
                // Park until the owner is dropped
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| PipelineError::Device("Capture thread exited during startup".into()))??;

        tracing::info!(
            device_rate = device_rate.as_u32(),
            upload_rate = upload_rate.as_u32(),
            "Microphone capture started"
        );

        Ok(Self {
            blocks: Mutex::new(block_rx),
            device_rate,
            upload_rate,
            endpoint,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    pub fn device_rate(&self) -> SampleRate {
        self.device_rate
    }
}

fn open_input_stream(
    block_tx: mpsc::Sender<Vec<f32>>,
) -> Result<(cpal::Stream, SampleRate), PipelineError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| PipelineError::Device("No input device available".into()))?;

    tracing::info!(
        device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
        "Using input device"
    );

    let supported = device
        .default_input_config()
        .map_err(|e| PipelineError::Device(format!("Failed to get input config: {}", e)))?;
    let rate = SampleRate::from_hz(supported.sample_rate().0).ok_or_else(|| {
        PipelineError::Device(format!(
            "Unsupported input sample rate: {}",
            supported.sample_rate().0
        ))
    })?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, block_tx)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, block_tx)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, block_tx)?,
        other => {
            return Err(PipelineError::Device(format!(
                "Unsupported input sample format: {:?}",
                other
            )))
        },
    };

    stream
        .play()
        .map_err(|e| PipelineError::Device(format!("Failed to start input stream: {}", e)))?;

    Ok((stream, rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    block_tx: mpsc::Sender<Vec<f32>>,
) -> Result<cpal::Stream, PipelineError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = config.channels.max(1) as usize;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|frame| {
                        frame.iter().map(|&s| s.to_sample::<f32>()).sum::<f32>()
                            / frame.len() as f32
                    })
                    .collect();
                if let Err(e) = block_tx.try_send(mono) {
                    tracing::trace!("Dropping capture block: {}", e);
                }
            },
            |err| tracing::error!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|e| PipelineError::Device(format!("Failed to build input stream: {}", e)))
}

#[async_trait]
impl AudioSource for MicrophoneCapture {
    async fn capture_utterance(&self) -> Result<CapturedAudio, PipelineError> {
        let mut blocks = self.blocks.lock().await;

        // Audio recorded while we were speaking or thinking is stale
        while blocks.try_recv().is_ok() {}

        let mut detector = UtteranceDetector::new(self.endpoint.clone());
        let mut sequence = 0u64;

        loop {
            let Some(block) = blocks.recv().await else {
                tracing::warn!("Microphone stream closed");
                return Ok(CapturedAudio::Closed);
            };

            let frame = AudioFrame::new(block, self.device_rate, sequence);
            sequence += 1;

            match detector.push(frame) {
                EndpointEvent::Continue => continue,
                EndpointEvent::NoSpeech => return Ok(CapturedAudio::Silence),
                EndpointEvent::Complete => {
                    let frames = detector.take_utterance();
                    let joined = AudioFrame::concat(&frames, self.device_rate);
                    tracing::debug!(
                        duration_ms = joined.duration_ms(),
                        blocks = frames.len(),
                        "Utterance captured"
                    );
                    return Ok(CapturedAudio::Speech(joined.resample(self.upload_rate)));
                },
            }
        }
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Capture thread panicked");
            }
        }
        tracing::info!("Microphone capture stopped");
    }
}
