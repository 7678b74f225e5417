//! Stem mixing for the offline renderer and the playback sink.
//!
//! Stateless; every function is pure.

use super::buffer::AudioBuffer;

/// One input of a mix: a decoded buffer and the fixed gain applied to it.
#[derive(Debug, Clone, Copy)]
pub struct Stem<'a> {
    pub buffer: &'a AudioBuffer,
    pub gain: f32,
}

impl<'a> Stem<'a> {
    pub fn new(buffer: &'a AudioBuffer, gain: f32) -> Self {
        Self { buffer, gain }
    }
}

pub struct AudioMixer;

impl AudioMixer {
    /// Sum `stems` into a `channel_count` buffer of exactly `frames` frames at
    /// `sample_rate`.
    ///
    /// Every stem starts at frame 0. Stems are resampled to `sample_rate` and
    /// remapped to the output layout first; shorter stems leave silence, longer
    /// ones are cut at `frames`. No normalization or clipping is applied.
    pub fn mix_stems(
        stems: &[Stem<'_>],
        channel_count: usize,
        sample_rate: u32,
        frames: usize,
    ) -> AudioBuffer {
        let mut out = AudioBuffer::silent(channel_count, frames, sample_rate);

        for stem in stems {
            let resampled: Vec<Vec<f32>> = stem
                .buffer
                .channels()
                .iter()
                .map(|c| Self::resample(c, stem.buffer.sample_rate(), sample_rate))
                .collect();
            let mapped = Self::remap_channels(&resampled, channel_count);

            for (dst, src) in out.channels_mut().iter_mut().zip(&mapped) {
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d += s * stem.gain;
                }
            }
        }

        out
    }

    /// Map a planar channel set onto `target` output channels.
    ///
    /// Mono is copied to every output channel, multi-channel input folded to
    /// mono is averaged, and otherwise channels map by index with extra input
    /// channels dropped and missing ones left silent.
    pub fn remap_channels(channels: &[Vec<f32>], target: usize) -> Vec<Vec<f32>> {
        let frames = channels.first().map(Vec::len).unwrap_or(0);

        match (channels.len(), target) {
            (_, 0) => Vec::new(),
            (0, _) => vec![Vec::new(); target],
            (1, _) => vec![channels[0].clone(); target],
            (n, 1) => {
                let mut mono = vec![0.0f32; frames];
                for channel in channels {
                    for (m, &s) in mono.iter_mut().zip(channel) {
                        *m += s;
                    }
                }
                for m in &mut mono {
                    *m /= n as f32;
                }
                vec![mono]
            }
            (_, _) => (0..target)
                .map(|i| {
                    channels
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| vec![0.0; frames])
                })
                .collect(),
        }
    }

    /// Resample audio from one sample rate to another using linear interpolation.
    pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
        if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
            return samples.to_vec();
        }

        let ratio = from_rate as f64 / to_rate as f64;
        let new_len = (samples.len() as f64 / ratio).round() as usize;
        let mut resampled = Vec::with_capacity(new_len);

        for i in 0..new_len {
            let src_pos = i as f64 * ratio;
            let src_idx = src_pos as usize;
            let frac = src_pos - src_idx as f64;

            let sample = if src_idx + 1 < samples.len() {
                // Linear interpolation
                samples[src_idx] as f64 * (1.0 - frac) + samples[src_idx + 1] as f64 * frac
            } else if src_idx < samples.len() {
                samples[src_idx] as f64
            } else {
                0.0
            };

            resampled.push(sample as f32);
        }

        resampled
    }
}
