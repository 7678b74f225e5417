//! The backing track the singer performs over.
//!
//! The studio never owns the track's lifetime; it drives the transport
//! (play / pause / rewind / volume) through [`BackingTrack`] and fetches the
//! raw bytes through [`TrackSource`] when it needs to render offline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::buffer::AudioBuffer;
use super::decode::decode_audio;
use super::output::{GainHandle, Playback, PlaybackSink, PreparedAudio};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("cannot read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the backing track's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum TrackSource {
    Url(String),
    File(PathBuf),
}

impl TrackSource {
    /// `http(s)://` locations are URLs, `file://` and everything else a path.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            Self::File(PathBuf::from(path))
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    /// File extension used as a decoder hint.
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            Self::Url(url) => {
                let without_query = url.split(['?', '#']).next().unwrap_or(url);
                Path::new(without_query).to_path_buf()
            }
            Self::File(path) => path.clone(),
        };
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Fetch the raw encoded bytes.
    pub async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<u8>, FetchError> {
        match self {
            Self::Url(url) => {
                debug!("Fetching backing track from {}", url);
                let http_err = |source| FetchError::Http {
                    url: url.clone(),
                    source,
                };
                let response = client.get(url).send().await.map_err(http_err)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                let bytes = response.bytes().await.map_err(http_err)?;
                Ok(bytes.to_vec())
            }
            Self::File(path) => {
                debug!("Reading backing track from {:?}", path);
                tokio::fs::read(path).await.map_err(|source| FetchError::File {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Transport of the shared backing track element.
pub trait BackingTrack {
    fn source(&self) -> &TrackSource;

    /// Start (or resume) playing from the current position.
    fn play(&mut self) -> Result<()>;

    /// Pause, keeping the position.
    fn pause(&mut self);

    /// Move the position back to zero without changing play state.
    fn rewind(&mut self);

    fn is_playing(&self) -> bool;

    fn position(&self) -> Duration;

    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;
}

/// Backing track decoded into memory and played through a [`PlaybackSink`].
///
/// The track is converted to the sink's layout when the player is built, so
/// `play` and `rewind` only open a stream.
pub struct TrackPlayer {
    source: TrackSource,
    audio: Arc<PreparedAudio>,
    sink: Arc<dyn PlaybackSink>,
    gain: GainHandle,
    current: Option<Box<dyn Playback>>,
    offset_frames: usize,
}

impl TrackPlayer {
    /// Fetch, decode and prepare `source`, ready to play at full volume from zero.
    pub async fn load(
        source: TrackSource,
        sink: Arc<dyn PlaybackSink>,
        client: &reqwest::Client,
    ) -> Result<Self> {
        let bytes = source
            .fetch(client)
            .await
            .with_context(|| format!("Failed to load backing track {source}"))?;
        let extension = source.extension();
        let layout = sink.layout();
        let audio = tokio::task::spawn_blocking(move || {
            decode_audio(bytes, extension.as_deref())
                .map(|buffer| PreparedAudio::new(&buffer, layout))
        })
        .await
        .context("Backing track decode task failed")?
        .with_context(|| format!("Failed to decode backing track {source}"))?;

        let player = Self::prepared(source, Arc::new(audio), sink);
        info!(
            "Backing track loaded: {} ({:.1}s)",
            player.source,
            player.duration().as_secs_f64()
        );
        Ok(player)
    }

    /// Prepare `buffer` for `sink` on the calling thread.
    pub fn new(source: TrackSource, buffer: AudioBuffer, sink: Arc<dyn PlaybackSink>) -> Self {
        let audio = PreparedAudio::new(&buffer, sink.layout());
        Self::prepared(source, Arc::new(audio), sink)
    }

    fn prepared(source: TrackSource, audio: Arc<PreparedAudio>, sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            source,
            audio,
            sink,
            gain: GainHandle::new(1.0),
            current: None,
            offset_frames: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        self.audio.remaining(0)
    }
}

impl BackingTrack for TrackPlayer {
    fn source(&self) -> &TrackSource {
        &self.source
    }

    fn play(&mut self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        // Played to the end: start over.
        if let Some(mut finished) = self.current.take() {
            finished.stop();
            self.offset_frames = 0;
        }
        if self.offset_frames >= self.audio.source_frames() {
            self.offset_frames = 0;
        }

        let start = self
            .sink
            .play(self.audio.clone(), self.offset_frames, self.gain.clone())
            .context("Failed to start backing track")?;
        self.current = Some(start.playback);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(mut playback) = self.current.take() {
            self.offset_frames = playback
                .position_frames()
                .min(self.audio.source_frames());
            playback.stop();
        }
    }

    fn rewind(&mut self) {
        let was_playing = self.is_playing();
        self.pause();
        self.offset_frames = 0;
        if was_playing {
            if let Err(e) = self.play() {
                warn!("Failed to restart backing track after rewind: {}", e);
            }
        }
    }

    fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|p| !p.is_finished())
    }

    fn position(&self) -> Duration {
        let frames = match &self.current {
            Some(playback) => playback.position_frames(),
            None => self.offset_frames,
        };
        let rate = self.audio.source_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        let frames = frames.min(self.audio.source_frames());
        Duration::from_secs_f64(frames as f64 / rate as f64)
    }

    fn set_volume(&mut self, volume: f32) {
        self.gain.set(volume);
    }

    fn volume(&self) -> f32 {
        self.gain.get()
    }
}
