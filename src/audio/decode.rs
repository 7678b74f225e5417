//! Decode encoded audio bytes (WAV, MP3, FLAC, OGG/Vorbis) into an [`AudioBuffer`]
//! at the stream's native sample rate.

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

use super::buffer::AudioBuffer;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported or unrecognized audio format: {0}")]
    Unsupported(String),
    #[error("no decodable audio track found")]
    NoTrack,
    #[error("audio stream contained no samples")]
    NoAudio,
    #[error("audio decode failed: {0}")]
    Codec(#[from] SymphoniaError),
}

/// Decode a complete in-memory file.
///
/// `extension` is an optional probe hint ("wav", "mp3", ...); the container is
/// detected from its magic bytes either way.
pub fn decode_audio(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer, DecodeError> {
    let byte_len = bytes.len();
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channel_count = spec.channels.count();

                let needed = decoded.capacity() * channel_count;
                if sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping undecodable packet: {}", msg);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if interleaved.is_empty() || channel_count == 0 || sample_rate == 0 {
        return Err(DecodeError::NoAudio);
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, channel_count, sample_rate);
    debug!(
        "Decoded {} bytes: {} ch, {} Hz, {:.2}s",
        byte_len,
        buffer.channel_count(),
        buffer.sample_rate(),
        buffer.duration_secs()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{encode_wav, WavOptions};

    #[test]
    fn test_decodes_pcm16_wav() {
        let source = AudioBuffer::new(vec![vec![0.25; 4410], vec![-0.25; 4410]], 44100);
        let bytes = encode_wav(&source, WavOptions::pcm16()).unwrap();

        let decoded = decode_audio(bytes, Some("wav")).unwrap();
        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.sample_rate(), 44100);
        assert_eq!(decoded.frames(), 4410);
        assert!((decoded.channel(0).unwrap()[100] - 0.25).abs() < 1e-3);
        assert!((decoded.channel(1).unwrap()[100] + 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decodes_float_wav_without_hint() {
        let source = AudioBuffer::new(vec![vec![0.5; 800]], 8000);
        let bytes = encode_wav(&source, WavOptions::float32()).unwrap();

        let decoded = decode_audio(bytes, None).unwrap();
        assert_eq!(decoded.channel_count(), 1);
        assert_eq!(decoded.sample_rate(), 8000);
        assert_eq!(decoded.frames(), 800);
    }

    #[test]
    fn test_rejects_garbage() {
        let result = decode_audio(b"definitely not audio".to_vec(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(decode_audio(Vec::new(), Some("wav")).is_err());
    }
}
