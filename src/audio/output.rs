//! Real-time playback of decoded buffers.
//!
//! Sources are converted to the device layout once, as [`PreparedAudio`].
//! A [`PlaybackSink`] starts one independent playback per call. Each playback
//! reads a live [`GainHandle`] on every callback, reports when the source has
//! been fully played, and is torn down when stopped or dropped.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::audio_mixer::AudioMixer;
use super::buffer::AudioBuffer;

/// Shared, lock-free gain value. Cloning yields a handle to the same value.
#[derive(Debug, Clone)]
pub struct GainHandle(Arc<AtomicU32>);

impl GainHandle {
    pub fn new(gain: f32) -> Self {
        Self(Arc::new(AtomicU32::new(gain.to_bits())))
    }

    pub fn set(&self, gain: f32) {
        self.0.store(gain.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Channel count and sample rate an output device consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    pub channels: usize,
    pub sample_rate: u32,
}

/// Audio already resampled, remapped and interleaved for one [`OutputLayout`].
///
/// Built once per source; starting a playback from any offset only moves a
/// cursor into it.
#[derive(Debug)]
pub struct PreparedAudio {
    samples: Vec<f32>,
    layout: OutputLayout,
    source_rate: u32,
    source_frames: usize,
}

impl PreparedAudio {
    pub fn new(buffer: &AudioBuffer, layout: OutputLayout) -> Self {
        let resampled: Vec<Vec<f32>> = buffer
            .channels()
            .iter()
            .map(|c| AudioMixer::resample(c, buffer.sample_rate(), layout.sample_rate))
            .collect();
        let mapped = AudioMixer::remap_channels(&resampled, layout.channels);
        let samples = AudioBuffer::new(mapped, layout.sample_rate).interleaved();

        Self {
            samples,
            layout,
            source_rate: buffer.sample_rate(),
            source_frames: buffer.frames(),
        }
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    /// Length in frames of the source buffer.
    pub fn source_frames(&self) -> usize {
        self.source_frames
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    /// Time left when playing from `source_frame`.
    pub fn remaining(&self, source_frame: usize) -> Duration {
        if self.source_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.source_frames.saturating_sub(source_frame);
        Duration::from_secs_f64(frames as f64 / self.source_rate as f64)
    }

    fn device_frames(&self) -> usize {
        self.samples.len() / self.layout.channels.max(1)
    }

    /// Interleaved sample index at which `source_frame` starts.
    fn sample_offset(&self, source_frame: usize) -> usize {
        if self.source_rate == 0 {
            return 0;
        }
        let frame = (source_frame as u64 * self.layout.sample_rate as u64
            / self.source_rate as u64) as usize;
        frame.min(self.device_frames()) * self.layout.channels
    }

    /// Source frame reached at interleaved sample index `offset`.
    fn source_frame_at(&self, offset: usize) -> usize {
        if self.layout.sample_rate == 0 {
            return 0;
        }
        let played = offset / self.layout.channels.max(1);
        let frame = (played as u64 * self.source_rate as u64 / self.layout.sample_rate as u64)
            as usize;
        frame.min(self.source_frames)
    }
}

/// A running playback started by a [`PlaybackSink`].
pub trait Playback {
    /// Halt output. Idempotent.
    fn stop(&mut self);

    /// True once the whole source has been played.
    fn is_finished(&self) -> bool;

    /// Source frames consumed so far, counted from frame 0 of the source buffer.
    fn position_frames(&self) -> usize;
}

pub struct PlaybackStart {
    pub playback: Box<dyn Playback>,
    /// Resolves when the source plays to its end. Dropped without a value when
    /// the playback is stopped first.
    pub ended: oneshot::Receiver<()>,
}

pub trait PlaybackSink {
    /// The layout [`PreparedAudio`] must be built for.
    fn layout(&self) -> OutputLayout;

    /// Play `audio` from source frame `start_frame` through `gain`.
    ///
    /// Only opens a stream; all sample conversion happened in
    /// [`PreparedAudio::new`].
    fn play(
        &self,
        audio: Arc<PreparedAudio>,
        start_frame: usize,
        gain: GainHandle,
    ) -> Result<PlaybackStart>;
}

/// The system default output device.
pub struct DeviceSink {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
}

impl DeviceSink {
    pub fn default_output() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No audio output device available")?;
        let config = device
            .default_output_config()
            .context("Failed to query output device configuration")?;

        info!(
            "Playback device: {} ({} ch @ {} Hz)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.channels(),
            config.sample_rate().0
        );

        Ok(Self { device, config })
    }

    fn build_stream<T>(&self, state: Arc<StreamState>) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let config: cpal::StreamConfig = self.config.config();
        let err_fn = |err| error!("Playback stream error: {}", err);

        let stream = self.device.build_output_stream(
            &config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| state.fill(data),
            err_fn,
            None,
        )?;

        Ok(stream)
    }
}

impl PlaybackSink for DeviceSink {
    fn layout(&self) -> OutputLayout {
        OutputLayout {
            channels: self.config.channels() as usize,
            sample_rate: self.config.sample_rate().0,
        }
    }

    fn play(
        &self,
        audio: Arc<PreparedAudio>,
        start_frame: usize,
        gain: GainHandle,
    ) -> Result<PlaybackStart> {
        if audio.layout() != self.layout() {
            return Err(anyhow!(
                "Audio prepared for {:?} cannot play on {:?}",
                audio.layout(),
                self.layout()
            ));
        }

        let (ended_tx, ended_rx) = oneshot::channel();
        let state = Arc::new(StreamState::new(audio, start_frame, gain, ended_tx));

        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(state.clone()),
            cpal::SampleFormat::I16 => self.build_stream::<i16>(state.clone()),
            cpal::SampleFormat::U16 => self.build_stream::<u16>(state.clone()),
            other => Err(anyhow!("Unsupported output sample format: {other:?}")),
        }
        .context("Failed to open playback stream")?;
        stream.play().context("Failed to start playback stream")?;

        debug!("Playback started at frame {}", start_frame);

        Ok(PlaybackStart {
            playback: Box::new(DevicePlayback {
                stream: Some(stream),
                state,
            }),
            ended: ended_rx,
        })
    }
}

struct StreamState {
    audio: Arc<PreparedAudio>,
    cursor: AtomicUsize,
    finished: AtomicBool,
    gain: GainHandle,
    ended: Mutex<Option<oneshot::Sender<()>>>,
}

impl StreamState {
    fn new(
        audio: Arc<PreparedAudio>,
        start_frame: usize,
        gain: GainHandle,
        ended: oneshot::Sender<()>,
    ) -> Self {
        Self {
            cursor: AtomicUsize::new(audio.sample_offset(start_frame)),
            audio,
            finished: AtomicBool::new(false),
            gain,
            ended: Mutex::new(Some(ended)),
        }
    }

    fn fill<T>(&self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        let samples = &self.audio.samples;
        let gain = self.gain.get();
        let mut cursor = self.cursor.load(Ordering::Relaxed);

        for out in data.iter_mut() {
            *out = match samples.get(cursor) {
                Some(&s) => {
                    cursor += 1;
                    T::from_sample(s * gain)
                }
                None => T::EQUILIBRIUM,
            };
        }
        self.cursor.store(cursor, Ordering::Relaxed);

        if cursor >= samples.len() && !self.finished.swap(true, Ordering::AcqRel) {
            if let Ok(mut ended) = self.ended.lock() {
                if let Some(tx) = ended.take() {
                    let _ = tx.send(());
                }
            }
        }
    }
}

struct DevicePlayback {
    stream: Option<cpal::Stream>,
    state: Arc<StreamState>,
}

impl Playback for DevicePlayback {
    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            drop(stream);
            debug!("Playback stopped");
        }
    }

    fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }

    fn position_frames(&self) -> usize {
        let offset = self.state.cursor.load(Ordering::Relaxed);
        self.state.audio.source_frame_at(offset)
    }
}

impl Drop for DevicePlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
