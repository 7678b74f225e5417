//! In-memory RIFF/WAVE encoding of an [`AudioBuffer`].
//!
//! Pure transform: no files, no state. The result is a complete,
//! self-describing container ready to be saved or uploaded.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use thiserror::Error;

use super::buffer::AudioBuffer;

pub const WAV_MIME: &str = "audio/wav";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode a buffer with no channels")]
    NoChannels,
    #[error("cannot encode an empty buffer")]
    Empty,
    #[error("cannot encode a buffer with sample rate 0")]
    ZeroSampleRate,
    #[error("channels have different lengths")]
    RaggedChannels,
    #[error("too many channels: {0}")]
    TooManyChannels(usize),
    #[error("wav writer failed: {0}")]
    Wav(#[from] hound::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WavOptions {
    /// Write IEEE float samples instead of 16-bit integers.
    pub float32: bool,
}

impl WavOptions {
    pub fn float32() -> Self {
        Self { float32: true }
    }

    pub fn pcm16() -> Self {
        Self { float32: false }
    }

    pub fn bytes_per_sample(&self) -> u16 {
        if self.float32 {
            4
        } else {
            2
        }
    }
}

/// Encode `buffer` as a WAV byte stream.
///
/// 16-bit output is quantized as `round(s * 32768)` and clamped to the i16
/// range, so out-of-range samples clip instead of wrapping.
pub fn encode_wav(buffer: &AudioBuffer, options: WavOptions) -> Result<Vec<u8>, EncodeError> {
    let channel_count = buffer.channel_count();
    if channel_count == 0 {
        return Err(EncodeError::NoChannels);
    }
    if channel_count > u16::MAX as usize {
        return Err(EncodeError::TooManyChannels(channel_count));
    }
    if buffer.sample_rate() == 0 {
        return Err(EncodeError::ZeroSampleRate);
    }
    if !buffer.is_rectangular() {
        return Err(EncodeError::RaggedChannels);
    }
    if buffer.frames() == 0 {
        return Err(EncodeError::Empty);
    }

    let spec = WavSpec {
        channels: channel_count as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: options.bytes_per_sample() * 8,
        sample_format: if options.float32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut cursor = Cursor::new(Vec::with_capacity(
        44 + buffer.frames() * channel_count * options.bytes_per_sample() as usize,
    ));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        let channels = buffer.channels();
        for frame in 0..buffer.frames() {
            for channel in channels {
                let sample = channel[frame];
                if options.float32 {
                    writer.write_sample(sample)?;
                } else {
                    writer.write_sample(quantize_i16(sample))?;
                }
            }
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

fn quantize_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    /// Walk the RIFF chunk list and return (id, body) pairs.
    fn chunks(bytes: &[u8]) -> Vec<([u8; 4], &[u8])> {
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        let mut out = Vec::new();
        let mut pos = 12;
        while pos + 8 <= bytes.len() {
            let id = [bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]];
            let size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
            let body = &bytes[pos + 8..pos + 8 + size];
            out.push((id, body));
            pos += 8 + size + (size & 1);
        }
        out
    }

    fn chunk<'a>(bytes: &'a [u8], id: &[u8; 4]) -> &'a [u8] {
        chunks(bytes)
            .into_iter()
            .find(|(cid, _)| cid == id)
            .map(|(_, body)| body)
            .unwrap()
    }

    fn sine(frames: usize, channels: usize) -> AudioBuffer {
        let data = (0..channels)
            .map(|c| {
                (0..frames)
                    .map(|i| ((i as f32 * 0.05) + c as f32).sin() * 0.9)
                    .collect()
            })
            .collect();
        AudioBuffer::new(data, 44100)
    }

    #[test]
    fn test_pcm16_round_trip_within_quantization_bound() {
        let mut buffer = sine(500, 2);
        buffer.channels_mut()[0][0] = 1.0;
        buffer.channels_mut()[1][0] = -1.0;
        let bytes = encode_wav(&buffer, WavOptions::pcm16()).unwrap();

        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.spec().sample_format, SampleFormat::Int);
        let decoded: Vec<f32> = reader
            .samples::<i16>()
            .map(|s| s.unwrap() as f32 / 32768.0)
            .collect();

        let original = buffer.interleaved();
        assert_eq!(decoded.len(), original.len());
        for (a, b) in original.iter().zip(&decoded) {
            assert!((a - b).abs() <= 1.0 / 32768.0, "{a} vs {b}");
        }
    }

    #[test]
    fn test_float32_round_trip_is_exact() {
        let buffer = sine(300, 2);
        let bytes = encode_wav(&buffer, WavOptions::float32()).unwrap();

        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_format, SampleFormat::Float);
        let decoded: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, buffer.interleaved());
    }

    #[test]
    fn test_pcm16_clips_out_of_range() {
        let buffer = AudioBuffer::new(vec![vec![1.5, -1.5, 2.0]], 8000);
        let bytes = encode_wav(&buffer, WavOptions::pcm16()).unwrap();
        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![i16::MAX, i16::MIN, i16::MAX]);
    }

    #[test]
    fn test_header_byte_rate_and_data_size() {
        for (options, channels, rate) in [
            (WavOptions::pcm16(), 1, 22050),
            (WavOptions::pcm16(), 2, 44100),
            (WavOptions::float32(), 2, 44100),
            (WavOptions::float32(), 1, 48000),
        ] {
            let frames = 1234;
            let buffer = AudioBuffer::silent(channels, frames, rate);
            let bytes = encode_wav(&buffer, options).unwrap();

            let fmt = chunk(&bytes, b"fmt ");
            let declared_channels = u16::from_le_bytes(fmt[2..4].try_into().unwrap());
            let declared_rate = u32::from_le_bytes(fmt[4..8].try_into().unwrap());
            let byte_rate = u32::from_le_bytes(fmt[8..12].try_into().unwrap());
            let block_align = u16::from_le_bytes(fmt[12..14].try_into().unwrap());
            let bytes_per_sample = options.bytes_per_sample() as u32;

            assert_eq!(declared_channels as usize, channels);
            assert_eq!(declared_rate, rate);
            assert_eq!(byte_rate, rate * channels as u32 * bytes_per_sample);
            assert_eq!(block_align as u32, channels as u32 * bytes_per_sample);

            let data = chunk(&bytes, b"data");
            assert_eq!(data.len(), frames * channels * bytes_per_sample as usize);

            let riff_size = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
            assert_eq!(riff_size, bytes.len() - 8);
        }
    }

    #[test]
    fn test_rejects_malformed_input() {
        let no_channels = AudioBuffer::new(Vec::new(), 44100);
        assert!(matches!(
            encode_wav(&no_channels, WavOptions::float32()),
            Err(EncodeError::NoChannels)
        ));

        let empty = AudioBuffer::silent(2, 0, 44100);
        assert!(matches!(
            encode_wav(&empty, WavOptions::float32()),
            Err(EncodeError::Empty)
        ));

        let ragged = AudioBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100);
        assert!(matches!(
            encode_wav(&ragged, WavOptions::pcm16()),
            Err(EncodeError::RaggedChannels)
        ));

        let no_rate = AudioBuffer::silent(1, 10, 0);
        assert!(matches!(
            encode_wav(&no_rate, WavOptions::pcm16()),
            Err(EncodeError::ZeroSampleRate)
        ));
    }
}
