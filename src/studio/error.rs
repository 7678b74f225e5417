use thiserror::Error;

use crate::audio::{DecodeError, EncodeError, FetchError};

/// Failures surfaced to the user at a studio operation boundary.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Microphone unavailable: {0}")]
    Microphone(String),
    #[error("No audio was captured from the microphone")]
    EmptyCapture,
    #[error("Could not decode the {what}: {source}")]
    Decode {
        what: &'static str,
        source: DecodeError,
    },
    #[error("Could not fetch the backing track: {0}")]
    Fetch(#[from] FetchError),
    #[error("Could not encode the mix: {0}")]
    Encode(#[from] EncodeError),
    #[error("Playback failed: {0}")]
    Playback(String),
    #[error("Could not save the mix: {0}")]
    Upload(String),
    #[error("There is no voice recording to work with")]
    MissingVoice,
    #[error("Cannot save: the backing song is not identified")]
    MissingSong,
    #[error("Background audio task failed: {0}")]
    Worker(String),
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    pub fn decode(what: &'static str, source: DecodeError) -> Self {
        Self::Decode { what, source }
    }
}
