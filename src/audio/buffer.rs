//! Planar multi-channel sample buffer shared by the decoder, mixer and encoder.

use std::time::Duration;

/// Decoded audio: one `Vec<f32>` per channel, all of equal length,
/// normalized to roughly [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// A buffer of `frames` zeroed frames.
    pub fn silent(channel_count: usize, frames: usize, sample_rate: u32) -> Self {
        Self::new(vec![vec![0.0; frames]; channel_count], sample_rate)
    }

    /// Split interleaved samples (as delivered by cpal or symphonia) into channels.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        if channel_count == 0 {
            return Self::new(Vec::new(), sample_rate);
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    /// True when every channel holds the same number of frames.
    pub fn is_rectangular(&self) -> bool {
        let frames = self.frames();
        self.channels.iter().all(|c| c.len() == frames)
    }

    /// Interleave channels frame by frame (L R L R ...).
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let count = self.channel_count();
        let mut out = Vec::with_capacity(frames * count);
        for i in 0..frames {
            for channel in &self.channels {
                out.push(channel.get(i).copied().unwrap_or(0.0));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved_splits_channels() {
        let buffer = AudioBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3, -0.3], 2, 8000);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channel(0).unwrap(), &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.1, -0.2, -0.3]);
    }

    #[test]
    fn test_from_interleaved_drops_partial_frame() {
        let buffer = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3], 2, 8000);
        assert_eq!(buffer.frames(), 1);
    }

    #[test]
    fn test_interleaved_restores_order() {
        let samples = vec![0.5, -0.5, 0.25, -0.25];
        let buffer = AudioBuffer::from_interleaved(&samples, 2, 44100);
        assert_eq!(buffer.interleaved(), samples);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::silent(2, 22050, 44100);
        assert!((buffer.duration_secs() - 0.5).abs() < f64::EPSILON);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_rate_has_zero_duration() {
        let buffer = AudioBuffer::silent(1, 100, 0);
        assert_eq!(buffer.duration_secs(), 0.0);
    }
}
