//! Speaker playback on the default output device

use std::collections::VecDeque;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use voice_chat_core::{AudioFrame, SampleRate};

use super::AudioSink;
use crate::PipelineError;

/// Slack on top of the clip duration before playback is declared stuck
const DRAIN_GRACE: Duration = Duration::from_secs(5);

#[derive(Default)]
struct PlaybackQueue {
    samples: VecDeque<f32>,
    done: Option<oneshot::Sender<()>>,
}

/// Default speaker; `play` returns once the clip has drained
pub struct SpeakerPlayback {
    queue: Arc<Mutex<PlaybackQueue>>,
    device_rate: SampleRate,
    /// One clip at a time
    playing: tokio::sync::Mutex<()>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SpeakerPlayback {
    /// Open the default output device
    pub fn open() -> Result<Self, PipelineError> {
        let queue = Arc::new(Mutex::new(PlaybackQueue::default()));
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let stream_queue = Arc::clone(&queue);
        let thread = std::thread::Builder::new()
            .name("speaker-playback".into())
            .spawn(move || {
                let stream = match open_output_stream(stream_queue) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    },
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    },
                };
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| PipelineError::Device("Playback thread exited during startup".into()))??;

        tracing::info!(device_rate = device_rate.as_u32(), "Speaker playback started");

        Ok(Self {
            queue,
            device_rate,
            playing: tokio::sync::Mutex::new(()),
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

fn open_output_stream(
    queue: Arc<Mutex<PlaybackQueue>>,
) -> Result<(cpal::Stream, SampleRate), PipelineError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PipelineError::Device("No output device available".into()))?;

    tracing::info!(
        device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
        "Using output device"
    );

    let supported = device
        .default_output_config()
        .map_err(|e| PipelineError::Device(format!("Failed to get output config: {}", e)))?;
    let rate = SampleRate::from_hz(supported.sample_rate().0).ok_or_else(|| {
        PipelineError::Device(format!(
            "Unsupported output sample rate: {}",
            supported.sample_rate().0
        ))
    })?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, queue)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, queue)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, queue)?,
        other => {
            return Err(PipelineError::Device(format!(
                "Unsupported output sample format: {:?}",
                other
            )))
        },
    };

    stream
        .play()
        .map_err(|e| PipelineError::Device(format!("Failed to start output stream: {}", e)))?;

    Ok((stream, rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: Arc<Mutex<PlaybackQueue>>,
) -> Result<cpal::Stream, PipelineError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut queue = queue.lock();
                for frame in data.chunks_mut(channels) {
                    let sample = queue.samples.pop_front().unwrap_or(0.0);
                    let value = <T as cpal::Sample>::from_sample(sample);
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                }
                if queue.samples.is_empty() {
                    if let Some(done) = queue.done.take() {
                        let _ = done.send(());
                    }
                }
            },
            |err| tracing::error!("Audio output stream error: {}", err),
            None,
        )
        .map_err(|e| PipelineError::Device(format!("Failed to build output stream: {}", e)))
}

#[async_trait]
impl AudioSink for SpeakerPlayback {
    async fn play(&self, frame: AudioFrame) -> Result<(), PipelineError> {
        if frame.is_empty() {
            return Ok(());
        }

        let _guard = self.playing.lock().await;
        let frame = frame.resample(self.device_rate);
        let budget = frame.duration + DRAIN_GRACE;

        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut queue = self.queue.lock();
            queue.samples.extend(frame.samples.iter().copied());
            queue.done = Some(done_tx);
        }

        match tokio::time::timeout(budget, done_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(PipelineError::Device("Output stream stopped".into())),
            Err(_) => {
                let mut queue = self.queue.lock();
                queue.samples.clear();
                queue.done = None;
                Err(PipelineError::Device(format!(
                    "Playback did not finish within {}ms",
                    budget.as_millis()
                )))
            },
        }
    }
}

impl Drop for SpeakerPlayback {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Playback thread panicked");
            }
        }
        tracing::info!("Speaker playback stopped");
    }
}
