pub mod audio_mixer;
pub mod audio_source;
pub mod backing_track;
pub mod buffer;
pub mod decode;
pub mod mic_source;
pub mod output;
pub mod wav;

pub use audio_mixer::{AudioMixer, Stem};
pub use audio_source::{AudioSource, Capture, CapturedAudio};
pub use backing_track::{BackingTrack, FetchError, TrackPlayer, TrackSource};
pub use buffer::AudioBuffer;
pub use decode::{decode_audio, DecodeError};
pub use mic_source::MicAudioSource;
pub use output::{
    DeviceSink, GainHandle, OutputLayout, Playback, PlaybackSink, PlaybackStart, PreparedAudio,
};
pub use wav::{encode_wav, EncodeError, WavOptions, WAV_MIME};
