//! Studio phases, the transition table, and the status shared with the API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::params::MixParameters;
use super::voice::VoiceInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudioPhase {
    Idle,
    CountingDown,
    Recording,
    Ready,
    PreviewPlaying,
    Rendering,
    Saving,
}

impl StudioPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CountingDown => "counting_down",
            Self::Recording => "recording",
            Self::Ready => "ready",
            Self::PreviewPlaying => "preview_playing",
            Self::Rendering => "rendering",
            Self::Saving => "saving",
        }
    }

    /// A render or upload is in flight; user controls are locked out.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Rendering | Self::Saving)
    }
}

/// Requests that are subject to the state machine. Volume changes and
/// shutdown are valid in every phase and are not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    AutoStart,
    CountdownTick,
    Stop,
    TogglePreview,
    PreviewEnded,
    Download,
    Save,
    Discard,
}

/// Whether `action` is valid in `phase`. Invalid requests are no-ops.
pub fn accepts(phase: StudioPhase, action: Action) -> bool {
    use StudioPhase::*;

    match action {
        Action::Start => matches!(phase, Idle | Ready | PreviewPlaying),
        Action::AutoStart => phase == Idle,
        Action::CountdownTick => phase == CountingDown,
        Action::Stop => phase == Recording,
        Action::TogglePreview => matches!(phase, Ready | PreviewPlaying),
        Action::PreviewEnded => phase == PreviewPlaying,
        Action::Download | Action::Save | Action::Discard => {
            matches!(phase, Ready | PreviewPlaying)
        }
    }
}

/// Identity of the backing song on the music backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRef {
    pub id: i64,
    pub title: Option<String>,
}

/// Confirmation of a mix stored in favorites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedMix {
    pub original_song_id: i64,
    pub saved_at: DateTime<Utc>,
    pub message: Option<String>,
    /// Where the client should navigate to see the saved mix.
    pub redirect: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudioStatus {
    pub phase: StudioPhase,
    pub countdown: Option<u8>,
    pub recording_started_at: Option<DateTime<Utc>>,
    pub params: MixParameters,
    pub voice: Option<VoiceInfo>,
    pub song: Option<SongRef>,
    pub last_error: Option<String>,
    pub last_saved: Option<SavedMix>,
    pub last_download: Option<PathBuf>,
}

impl Default for StudioStatus {
    fn default() -> Self {
        Self {
            phase: StudioPhase::Idle,
            countdown: None,
            recording_started_at: None,
            params: MixParameters::default(),
            voice: None,
            song: None,
            last_error: None,
            last_saved: None,
            last_download: None,
        }
    }
}

impl StudioStatus {
    /// Seconds since capture began, while recording.
    pub fn recording_seconds(&self) -> Option<u64> {
        self.recording_started_at.map(|started| {
            let elapsed = Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle for sharing studio state between the studio loop and API handlers.
#[derive(Clone, Default)]
pub struct StudioStatusHandle {
    inner: Arc<Mutex<StudioStatus>>,
}

impl StudioStatusHandle {
    pub async fn get(&self) -> StudioStatus {
        self.inner.lock().await.clone()
    }

    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut StudioStatus),
    {
        let mut status = self.inner.lock().await;
        f(&mut status);
    }

    pub async fn set_phase(&self, phase: StudioPhase) {
        self.inner.lock().await.phase = phase;
    }

    pub async fn set_error(&self, error: String) {
        self.inner.lock().await.last_error = Some(error);
    }

    pub async fn clear_error(&self) {
        self.inner.lock().await.last_error = None;
    }
}
