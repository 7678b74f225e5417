//! Microphone capture synchronized to the backing track.

use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::error::StudioError;
use super::params::MONITORING_VOLUME;
use super::voice::VoiceRecording;
use crate::audio::{AudioSource, BackingTrack, Capture};

/// A capture in progress. Owns the microphone stream: it is released by
/// [`stop`](Self::stop), [`abort`](Self::abort) or drop, and the first two
/// also put the backing track back at zero.
pub struct RecordingSession {
    capture: Box<dyn Capture>,
    started: Instant,
}

impl RecordingSession {
    /// Acquire the microphone, start the backing track from zero at monitoring
    /// volume, then start capture.
    ///
    /// The device is opened before the track moves, so a denied microphone
    /// never plays the track. The two start calls run back to back.
    pub fn start(
        mic: &mut dyn AudioSource,
        track: &mut dyn BackingTrack,
    ) -> Result<Self, StudioError> {
        let mut capture = mic
            .open()
            .map_err(|e| StudioError::Microphone(format!("{e:#}")))?;

        track.rewind();
        track.set_volume(MONITORING_VOLUME);
        track
            .play()
            .map_err(|e| StudioError::Playback(format!("{e:#}")))?;

        if let Err(e) = capture.start() {
            track.pause();
            track.rewind();
            return Err(StudioError::Microphone(format!("{e:#}")));
        }

        info!("Recording session started over {}", track.source());
        Ok(Self {
            capture,
            started: Instant::now(),
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop capture and the backing track, yielding the take.
    pub fn stop(self, track: &mut dyn BackingTrack) -> Result<VoiceRecording, StudioError> {
        let elapsed = self.elapsed();
        let captured = self.capture.finish();
        let reached = track.position();
        track.pause();
        track.rewind();

        let captured = captured.map_err(|e| StudioError::Microphone(format!("{e:#}")))?;
        info!(
            "Recording session stopped after {:.1}s (track at {:.1}s)",
            elapsed.as_secs_f64(),
            reached.as_secs_f64()
        );
        VoiceRecording::from_capture(captured)
    }

    /// Tear down without producing a take.
    pub fn abort(self, track: &mut dyn BackingTrack) {
        if let Err(e) = self.capture.finish() {
            warn!("Failed to release microphone: {}", e);
        }
        track.pause();
        track.rewind();
        info!("Recording session aborted");
    }
}
