//! Offline (faster than real time) two-stem render to WAV.
//!
//! Both stems are decoded at their native rate, resampled to 44.1 kHz, placed
//! at t = 0 with their frozen gains, and summed into a stereo buffer as long as
//! the longer stem.

use std::time::Duration;
use tracing::info;

use super::error::StudioError;
use super::params::MixParameters;
use super::voice::VoiceRecording;
use crate::audio::{
    decode_audio, encode_wav, AudioBuffer, AudioMixer, Stem, TrackSource, WavOptions,
};

pub const RENDER_SAMPLE_RATE: u32 = 44_100;
pub const RENDER_CHANNELS: usize = 2;

/// Encoded output of one render. Never cached.
#[derive(Debug, Clone)]
pub struct RenderedMix {
    pub bytes: Vec<u8>,
    pub frames: usize,
    pub duration: Duration,
}

/// Output length in frames for a mix of `duration_secs`.
pub fn render_frames(duration_secs: f64) -> usize {
    (duration_secs * RENDER_SAMPLE_RATE as f64).round() as usize
}

/// Mix two decoded stems into the stereo render buffer.
pub fn render_buffers(
    backing: &AudioBuffer,
    voice: &AudioBuffer,
    params: MixParameters,
) -> AudioBuffer {
    let duration = backing.duration_secs().max(voice.duration_secs());
    AudioMixer::mix_stems(
        &[
            Stem::new(backing, params.backing_volume()),
            Stem::new(voice, params.voice_volume()),
        ],
        RENDER_CHANNELS,
        RENDER_SAMPLE_RATE,
        render_frames(duration),
    )
}

/// Decode, mix and encode. CPU bound; run it off the async threads.
pub fn render_encoded(
    backing_bytes: Vec<u8>,
    backing_extension: Option<&str>,
    voice_bytes: Vec<u8>,
    voice_extension: Option<&str>,
    params: MixParameters,
    format: WavOptions,
) -> Result<RenderedMix, StudioError> {
    let backing = decode_audio(backing_bytes, backing_extension)
        .map_err(|e| StudioError::decode("backing track", e))?;
    let voice = decode_audio(voice_bytes, voice_extension)
        .map_err(|e| StudioError::decode("voice recording", e))?;

    let mixed = render_buffers(&backing, &voice, params);
    let bytes = encode_wav(&mixed, format)?;

    Ok(RenderedMix {
        frames: mixed.frames(),
        duration: mixed.duration(),
        bytes,
    })
}

pub struct OfflineMixRenderer {
    client: reqwest::Client,
}

impl OfflineMixRenderer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Render the take over the backing track as float32 WAV.
    pub async fn render(
        &self,
        backing: &TrackSource,
        voice: &VoiceRecording,
        params: MixParameters,
    ) -> Result<RenderedMix, StudioError> {
        info!(
            "Rendering mix: backing {:.2}, voice {:.2}",
            params.backing_volume(),
            params.voice_volume()
        );

        let backing_bytes = backing.fetch(&self.client).await?;
        let backing_extension = backing.extension();
        let voice_bytes = voice.bytes().to_vec();
        let voice_extension = voice.extension().to_string();

        let mix = tokio::task::spawn_blocking(move || {
            render_encoded(
                backing_bytes,
                backing_extension.as_deref(),
                voice_bytes,
                Some(voice_extension.as_str()),
                params,
                WavOptions::float32(),
            )
        })
        .await
        .map_err(|e| StudioError::Worker(e.to_string()))??;

        info!(
            "Mix rendered: {:.2}s, {} bytes",
            mix.duration.as_secs_f64(),
            mix.bytes.len()
        );
        Ok(mix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavReader};
    use std::io::Cursor;

    fn tone(seconds: f64, rate: u32, channels: usize, value: f32) -> AudioBuffer {
        let frames = (seconds * rate as f64).round() as usize;
        AudioBuffer::new(vec![vec![value; frames]; channels], rate)
    }

    fn wav(buffer: &AudioBuffer) -> Vec<u8> {
        encode_wav(buffer, WavOptions::pcm16()).unwrap()
    }

    fn data_chunk_size(bytes: &[u8]) -> u32 {
        let mut pos = 12;
        while pos + 8 <= bytes.len() {
            let size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap());
            if &bytes[pos..pos + 4] == b"data" {
                return size;
            }
            pos += 8 + size as usize + (size as usize & 1);
        }
        panic!("no data chunk");
    }

    #[test]
    fn test_length_is_longer_of_the_two_stems() {
        let cases = [
            ((1.5, 22050), (2.25, 48000)),
            ((3.0, 44100), (1.0, 16000)),
            ((0.5, 8000), (0.5, 8000)),
            ((2.0, 32000), (1.999, 44100)),
        ];
        for ((backing_secs, backing_rate), (voice_secs, voice_rate)) in cases {
            let backing = tone(backing_secs, backing_rate, 2, 0.1);
            let voice = tone(voice_secs, voice_rate, 1, 0.1);
            let out = render_buffers(&backing, &voice, MixParameters::default());

            let expected = (backing.duration_secs().max(voice.duration_secs()) * 44100.0).round()
                as usize;
            assert_eq!(out.frames(), expected);
            assert_eq!(out.channel_count(), 2);
            assert_eq!(out.sample_rate(), 44100);
        }
    }

    #[test]
    fn test_applies_frozen_gains() {
        let backing = tone(1.0, 44100, 2, 0.4);
        let voice = tone(0.5, 44100, 1, 0.2);
        let out = render_buffers(&backing, &voice, MixParameters::new(0.5, 2.0));

        let left = out.channel(0).unwrap();
        let right = out.channel(1).unwrap();
        // Both stems: 0.4 * 0.5 + 0.2 * 2.0
        assert!((left[100] - 0.6).abs() < 1e-6);
        assert!((right[100] - 0.6).abs() < 1e-6);
        // Backing only after the take ends
        assert!((left[30000] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_is_deterministic() {
        let backing = wav(&tone(0.3, 22050, 1, 0.3));
        let voice = wav(&tone(0.2, 16000, 1, -0.2));
        let params = MixParameters::new(0.7, 1.3);

        let a = render_encoded(
            backing.clone(),
            Some("wav"),
            voice.clone(),
            Some("wav"),
            params,
            WavOptions::float32(),
        )
        .unwrap();
        let b = render_encoded(backing, Some("wav"), voice, Some("wav"), params, WavOptions::float32())
            .unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_ten_second_track_with_seven_second_take() {
        let backing = wav(&tone(10.0, 22050, 1, 0.25));
        let voice = wav(&tone(7.0, 16000, 1, 0.5));

        let mix = render_encoded(
            backing,
            Some("wav"),
            voice,
            Some("wav"),
            MixParameters::new(0.5, 1.0),
            WavOptions::float32(),
        )
        .unwrap();

        assert_eq!(mix.frames, 10 * 44100);
        assert!((mix.duration.as_secs_f64() - 10.0).abs() < 1e-9);
        assert_eq!(data_chunk_size(&mix.bytes), 10 * 44100 * 2 * 4);

        let reader = WavReader::new(Cursor::new(mix.bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, SampleFormat::Float);
    }

    #[test]
    fn test_corrupt_voice_is_a_decode_error() {
        let backing = wav(&tone(0.1, 8000, 1, 0.1));
        let result = render_encoded(
            backing,
            Some("wav"),
            b"garbage".to_vec(),
            Some("webm"),
            MixParameters::default(),
            WavOptions::float32(),
        );
        assert!(matches!(
            result,
            Err(StudioError::Decode {
                what: "voice recording",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backing_track_fails() {
        let voice = VoiceRecording::from_bytes(
            wav(&tone(0.1, 8000, 1, 0.1)),
            "audio/wav",
            "wav",
            Duration::from_millis(100),
        )
        .unwrap();
        let renderer = OfflineMixRenderer::new(reqwest::Client::new());
        let source = TrackSource::parse("/nonexistent/backing.mp3");

        let result = renderer.render(&source, &voice, MixParameters::default()).await;
        assert!(matches!(result, Err(StudioError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_render_from_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backing.wav");
        std::fs::write(&path, wav(&tone(1.0, 8000, 2, 0.1))).unwrap();
        let voice = VoiceRecording::from_bytes(
            wav(&tone(0.5, 8000, 1, 0.1)),
            "audio/wav",
            "wav",
            Duration::from_millis(500),
        )
        .unwrap();

        let renderer = OfflineMixRenderer::new(reqwest::Client::new());
        let mix = renderer
            .render(&TrackSource::File(path), &voice, MixParameters::default())
            .await
            .unwrap();
        assert_eq!(mix.frames, 44100);
    }
}
