//! Microphone audio capture via cpal.
//!
//! The input device is resolved on every `open`, so a microphone plugged in
//! (or a permission granted) after launch is picked up by the next session.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use super::audio_source::{AudioSource, Capture, CapturedAudio};

#[derive(Default)]
pub struct MicAudioSource;

impl MicAudioSource {
    pub fn new() -> Self {
        Self
    }
}

/// Samples shared between the input callback and the capture handle.
#[derive(Default)]
struct CaptureBuffer {
    armed: AtomicBool,
    chunks: Mutex<Vec<Vec<f32>>>,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    buffer: Arc<CaptureBuffer>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let err_fn = |err| error!("Microphone stream error: {}", err);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // Some hosts run a stream as soon as it is built.
            if !buffer.armed.load(Ordering::Acquire) {
                return;
            }
            let chunk: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
            let mut chunks = buffer.chunks.lock().unwrap_or_else(|e| e.into_inner());
            chunks.push(chunk);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

impl AudioSource for MicAudioSource {
    fn open(&mut self) -> Result<Box<dyn Capture>> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No microphone available")?;
        let supported = device
            .default_input_config()
            .context("Microphone access denied or device unavailable")?;

        info!(
            "Opening microphone: {} ({} ch @ {} Hz)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            supported.channels(),
            supported.sample_rate().0
        );

        let buffer = Arc::new(CaptureBuffer::default());
        let config: cpal::StreamConfig = supported.config();
        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, buffer.clone()),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, buffer.clone()),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, buffer.clone()),
            other => Err(anyhow!("Unsupported microphone sample format: {other:?}")),
        }
        .context("Failed to open microphone stream")?;

        Ok(Box::new(MicCapture {
            stream,
            buffer,
            channels: config.channels,
            sample_rate: config.sample_rate.0,
        }))
    }
}

struct MicCapture {
    stream: cpal::Stream,
    buffer: Arc<CaptureBuffer>,
    channels: u16,
    sample_rate: u32,
}

impl Capture for MicCapture {
    fn start(&mut self) -> Result<()> {
        self.buffer.armed.store(true, Ordering::Release);
        self.stream
            .play()
            .context("Failed to start microphone stream")?;
        debug!("Microphone capturing");
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<CapturedAudio> {
        let MicCapture {
            stream,
            buffer,
            channels,
            sample_rate,
        } = *self;

        debug!("Stopping microphone stream");
        drop(stream);

        let chunks = std::mem::take(&mut *buffer.chunks.lock().unwrap_or_else(|e| e.into_inner()));
        let chunk_count = chunks.len();
        let samples: Vec<f32> = chunks.into_iter().flatten().collect();

        info!(
            "Microphone stopped, {} samples in {} chunks",
            samples.len(),
            chunk_count
        );

        Ok(CapturedAudio {
            samples,
            channels,
            sample_rate,
            chunks: chunk_count,
        })
    }
}
