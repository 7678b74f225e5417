//! Audio source abstraction for capturing audio from an input device.

use anyhow::Result;

use super::buffer::AudioBuffer;

/// Everything one capture run produced: the callback chunks concatenated in
/// arrival order, interleaved, plus the stream layout.
#[derive(Debug, Clone, Default)]
pub struct CapturedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub chunks: usize,
}

impl CapturedAudio {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() || self.channels == 0
    }

    pub fn into_buffer(self) -> AudioBuffer {
        AudioBuffer::from_interleaved(&self.samples, self.channels as usize, self.sample_rate)
    }
}

/// Trait for audio capture sources (microphone, test doubles).
pub trait AudioSource {
    /// Acquire the input device and build a capture that is not yet running.
    ///
    /// Fails when no device is present or access is denied.
    fn open(&mut self) -> Result<Box<dyn Capture>>;
}

/// An acquired input stream. Dropping it releases the device and discards
/// anything captured.
pub trait Capture {
    /// Begin delivering samples. Nothing before this call is kept.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing, release the device and return all captured samples.
    fn finish(self: Box<Self>) -> Result<CapturedAudio>;
}
