//! One captured take.
//!
//! Immutable once created. The encoded bytes are also written to a temp file
//! so other players can open the take by path; that file lives exactly as long
//! as the `VoiceRecording` value.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::error::StudioError;
use crate::audio::{encode_wav, CapturedAudio, WavOptions, WAV_MIME};

/// Serializable summary of the current take, for status reporting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceInfo {
    pub duration_seconds: f64,
    pub size_bytes: usize,
    pub mime: String,
    pub path: PathBuf,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct VoiceRecording {
    bytes: Vec<u8>,
    mime: String,
    extension: String,
    duration: Duration,
    file: NamedTempFile,
    recorded_at: DateTime<Utc>,
}

impl VoiceRecording {
    /// Encode a microphone capture as 16-bit WAV.
    pub fn from_capture(captured: CapturedAudio) -> Result<Self, StudioError> {
        if captured.is_empty() {
            return Err(StudioError::EmptyCapture);
        }

        let chunks = captured.chunks;
        let buffer = captured.into_buffer();
        let duration = buffer.duration();
        let bytes = encode_wav(&buffer, WavOptions::pcm16())?;

        info!(
            "Voice take captured: {:.1}s from {} chunks, {} bytes",
            duration.as_secs_f64(),
            chunks,
            bytes.len()
        );

        Self::from_bytes(bytes, WAV_MIME, "wav", duration)
    }

    /// Wrap already-encoded audio (e.g. a take loaded from disk).
    pub fn from_bytes(
        bytes: Vec<u8>,
        mime: &str,
        extension: &str,
        duration: Duration,
    ) -> Result<Self, StudioError> {
        let mut file = tempfile::Builder::new()
            .prefix("karaoke-voice-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;

        Ok(Self {
            bytes,
            mime: mime.to_string(),
            extension: extension.to_string(),
            duration,
            file,
            recorded_at: Utc::now(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Playable location of the take.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn info(&self) -> VoiceInfo {
        VoiceInfo {
            duration_seconds: self.duration.as_secs_f64(),
            size_bytes: self.bytes.len(),
            mime: self.mime.clone(),
            path: self.path().to_path_buf(),
            recorded_at: self.recorded_at,
        }
    }
}

impl Drop for VoiceRecording {
    fn drop(&mut self) {
        debug!("Releasing voice take {:?}", self.file.path());
    }
}
