//! Live remix preview: the take through a live gain, started together with the
//! backing track at the mix volume.
//!
//! A fresh playback is built per preview. There is no drift correction between
//! the two sources; both start back to back and run for at most one song.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::error::StudioError;
use super::params::{MixParameters, MONITORING_VOLUME};
use super::voice::VoiceRecording;
use crate::audio::{
    decode_audio, BackingTrack, GainHandle, Playback, PlaybackSink, PreparedAudio,
};

pub struct MixPreview {
    generation: u64,
    voice_gain: GainHandle,
    playback: Box<dyn Playback>,
    voice_duration: Duration,
}

impl MixPreview {
    /// Decode the take, then start the backing track and the take back to back.
    ///
    /// Nothing is touched when the take cannot be decoded.
    ///
    /// Returns the preview and a receiver that resolves when the take has been
    /// played to its end.
    pub async fn start(
        generation: u64,
        voice: &VoiceRecording,
        sink: &dyn PlaybackSink,
        track: &mut dyn BackingTrack,
        params: MixParameters,
    ) -> Result<(Self, oneshot::Receiver<()>), StudioError> {
        let bytes = voice.bytes().to_vec();
        let extension = voice.extension().to_string();
        let layout = sink.layout();
        let audio = tokio::task::spawn_blocking(move || {
            decode_audio(bytes, Some(extension.as_str()))
                .map(|buffer| PreparedAudio::new(&buffer, layout))
        })
        .await
        .map_err(|e| StudioError::Worker(e.to_string()))?
        .map_err(|e| StudioError::decode("voice recording", e))?;
        let voice_duration = audio.remaining(0);

        track.set_volume(params.backing_volume());
        track.rewind();
        if let Err(e) = track.play() {
            track.set_volume(MONITORING_VOLUME);
            return Err(StudioError::Playback(format!("{e:#}")));
        }

        let voice_gain = GainHandle::new(params.voice_volume());
        let start = match sink.play(Arc::new(audio), 0, voice_gain.clone()) {
            Ok(start) => start,
            Err(e) => {
                track.pause();
                track.rewind();
                track.set_volume(MONITORING_VOLUME);
                return Err(StudioError::Playback(format!("{e:#}")));
            }
        };
        let playback = start.playback;

        info!(
            "Preview {} started ({:.1}s take, backing {:.2}, voice {:.2})",
            generation,
            voice_duration.as_secs_f64(),
            params.backing_volume(),
            params.voice_volume()
        );

        Ok((
            Self {
                generation,
                voice_gain,
                playback,
                voice_duration,
            },
            start.ended,
        ))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn voice_duration(&self) -> Duration {
        self.voice_duration
    }

    pub fn set_voice_volume(&self, volume: f32) {
        self.voice_gain.set(volume);
    }

    /// Halt the take, park the backing track at zero and restore monitoring volume.
    pub fn stop(mut self, track: &mut dyn BackingTrack) {
        self.playback.stop();
        let reached = track.position();
        track.pause();
        track.rewind();
        track.set_volume(MONITORING_VOLUME);
        debug!(
            "Preview {} stopped with the track at {:.1}s",
            self.generation,
            reached.as_secs_f64()
        );
    }
}
