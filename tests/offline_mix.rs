//! Integration tests for the offline mix path: encoded files in, WAV out.
//!
//! Runs without audio devices or network access.

use karaoke_studio::audio::{encode_wav, AudioBuffer, TrackSource, WavOptions};
use karaoke_studio::studio::{MixParameters, OfflineMixRenderer, VoiceRecording};
use std::io::Cursor;
use std::time::Duration;

fn sine(seconds: f64, rate: u32, channels: usize, freq: f32) -> AudioBuffer {
    let frames = (seconds * rate as f64).round() as usize;
    let wave: Vec<f32> = (0..frames)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
        .collect();
    AudioBuffer::new(vec![wave; channels], rate)
}

#[tokio::test]
async fn test_ten_second_song_with_seven_second_take() {
    let dir = tempfile::tempdir().unwrap();
    let backing_path = dir.path().join("song.wav");
    std::fs::write(
        &backing_path,
        encode_wav(&sine(10.0, 22050, 2, 220.0), WavOptions::pcm16()).unwrap(),
    )
    .unwrap();

    let voice = VoiceRecording::from_bytes(
        encode_wav(&sine(7.0, 48000, 1, 440.0), WavOptions::pcm16()).unwrap(),
        "audio/wav",
        "wav",
        Duration::from_secs(7),
    )
    .unwrap();

    let renderer = OfflineMixRenderer::new(reqwest::Client::new());
    let mix = renderer
        .render(
            &TrackSource::File(backing_path),
            &voice,
            MixParameters::new(0.5, 1.0),
        )
        .await
        .unwrap();

    assert_eq!(mix.frames, 441_000);

    let mut reader = hound::WavReader::new(Cursor::new(mix.bytes)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(reader.duration(), 441_000);

    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 441_000 * 2);

    // Past the take only the attenuated backing remains.
    let tail_peak = samples[8 * 44100 * 2..]
        .iter()
        .fold(0.0f32, |peak, s| peak.max(s.abs()));
    assert!(tail_peak > 0.2 && tail_peak <= 0.2501, "{tail_peak}");
}

#[tokio::test]
async fn test_mono_take_is_centered() {
    let dir = tempfile::tempdir().unwrap();
    let backing_path = dir.path().join("silence.wav");
    std::fs::write(
        &backing_path,
        encode_wav(&AudioBuffer::silent(1, 8000, 8000), WavOptions::pcm16()).unwrap(),
    )
    .unwrap();
    let voice = VoiceRecording::from_bytes(
        encode_wav(&sine(1.0, 8000, 1, 300.0), WavOptions::float32()).unwrap(),
        "audio/wav",
        "wav",
        Duration::from_secs(1),
    )
    .unwrap();

    let mix = OfflineMixRenderer::new(reqwest::Client::new())
        .render(&TrackSource::File(backing_path), &voice, MixParameters::new(0.5, 1.0))
        .await
        .unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(mix.bytes)).unwrap();
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    for frame in samples.chunks(2) {
        assert_eq!(frame[0], frame[1]);
    }
    assert!(samples.iter().any(|s| s.abs() > 0.1));
}
