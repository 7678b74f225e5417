//! The studio: owns the devices and the current take, and applies commands
//! from a single loop.
//!
//! Every command is first checked against [`accepts`]; a command that is not
//! valid in the current phase is logged and ignored. Operations that fail
//! record their message in the shared status and leave the take and the mix
//! parameters as they were. A microphone failure is the exception and leaves
//! the studio idle.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::command::StudioCommand;
use super::countdown::{spawn_countdown, COUNTDOWN_FROM, COUNTDOWN_TICK};
use super::error::StudioError;
use super::params::{MixParameters, MONITORING_VOLUME};
use super::preview::MixPreview;
use super::render::{OfflineMixRenderer, RenderedMix};
use super::session::RecordingSession;
use super::state::{accepts, Action, SavedMix, SongRef, StudioPhase, StudioStatusHandle};
use super::voice::{VoiceInfo, VoiceRecording};
use crate::audio::{AudioSource, BackingTrack, PlaybackSink};
use crate::favorites::MixUploader;

/// Where the client is sent after a mix has been stored.
pub const SAVED_MIX_REDIRECT: &str = "/favorites";

pub struct StudioDevices {
    pub mic: Box<dyn AudioSource>,
    pub track: Box<dyn BackingTrack>,
    pub sink: Arc<dyn PlaybackSink>,
}

#[derive(Debug, Clone)]
pub struct StudioOptions {
    pub download_dir: PathBuf,
    pub download_file_name: String,
    pub params: MixParameters,
    /// The backing song on the music backend. Saving needs it.
    pub song: Option<SongRef>,
}

enum Stage {
    Idle,
    CountingDown {
        remaining: u8,
        task: JoinHandle<()>,
    },
    Recording {
        session: RecordingSession,
        started_at: DateTime<Utc>,
    },
    Ready {
        voice: VoiceRecording,
        preview: Option<MixPreview>,
    },
}

pub struct Studio {
    devices: StudioDevices,
    renderer: OfflineMixRenderer,
    uploader: Option<Arc<dyn MixUploader>>,
    options: StudioOptions,
    params: MixParameters,
    stage: Stage,
    status: StudioStatusHandle,
    events: mpsc::Sender<StudioCommand>,
    preview_generation: u64,
    auto_started: bool,
}

impl Studio {
    /// `events` must feed the same loop that calls [`handle`](Self::handle);
    /// countdown ticks and preview end notifications come back through it.
    pub fn new(
        devices: StudioDevices,
        renderer: OfflineMixRenderer,
        uploader: Option<Arc<dyn MixUploader>>,
        options: StudioOptions,
        status: StudioStatusHandle,
        events: mpsc::Sender<StudioCommand>,
    ) -> Self {
        Self {
            devices,
            renderer,
            uploader,
            params: options.params,
            options,
            stage: Stage::Idle,
            status,
            events,
            preview_generation: 0,
            auto_started: false,
        }
    }

    pub fn phase(&self) -> StudioPhase {
        match &self.stage {
            Stage::Idle => StudioPhase::Idle,
            Stage::CountingDown { .. } => StudioPhase::CountingDown,
            Stage::Recording { .. } => StudioPhase::Recording,
            Stage::Ready { preview: None, .. } => StudioPhase::Ready,
            Stage::Ready {
                preview: Some(_), ..
            } => StudioPhase::PreviewPlaying,
        }
    }

    pub fn params(&self) -> MixParameters {
        self.params
    }

    pub fn voice(&self) -> Option<VoiceInfo> {
        match &self.stage {
            Stage::Ready { voice, .. } => Some(voice.info()),
            _ => None,
        }
    }

    pub fn status(&self) -> &StudioStatusHandle {
        &self.status
    }

    /// Publish the initial state. Call once before the first command.
    pub async fn publish(&self) {
        self.sync_status().await;
    }

    /// Process commands until `Shutdown` arrives or every sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<StudioCommand>) {
        self.publish().await;
        info!("Studio ready");

        while let Some(command) = commands.recv().await {
            let shutdown = command == StudioCommand::Shutdown;
            if let Err(e) = self.handle(command).await {
                debug!("Command failed: {}", e);
            }
            if shutdown {
                info!("Studio shut down");
                return;
            }
        }

        let _ = self.handle(StudioCommand::Shutdown).await;
        info!("Command channel closed, studio shut down");
    }

    /// Apply one command and return the resulting phase.
    pub async fn handle(&mut self, command: StudioCommand) -> Result<StudioPhase, StudioError> {
        let phase = self.phase();
        if let Some(action) = action_for(&command) {
            if !accepts(phase, action) {
                warn!("Ignoring {:?} while {}", command, phase.as_str());
                return Ok(phase);
            }
        }

        if is_user_command(&command) {
            self.status.clear_error().await;
        }

        let result = self.dispatch(command).await;
        self.sync_status().await;

        match result {
            Ok(()) => Ok(self.phase()),
            Err(e) => {
                error!("Studio operation failed: {}", e);
                self.status.set_error(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn dispatch(&mut self, command: StudioCommand) -> Result<(), StudioError> {
        match command {
            StudioCommand::Record => {
                self.begin_countdown();
                Ok(())
            }
            StudioCommand::AutoStart => {
                if self.auto_started {
                    debug!("Auto-start already used");
                    return Ok(());
                }
                self.auto_started = true;
                info!("Auto-starting recording");
                self.begin_countdown();
                Ok(())
            }
            StudioCommand::CountdownTick(remaining) => {
                if let Stage::CountingDown { remaining: shown, .. } = &mut self.stage {
                    *shown = remaining;
                }
                Ok(())
            }
            StudioCommand::CountdownElapsed => self.start_recording(),
            StudioCommand::Stop => self.stop_recording(),
            StudioCommand::TogglePreview => self.toggle_preview().await,
            StudioCommand::PreviewEnded(generation) => {
                self.finish_preview(generation);
                Ok(())
            }
            StudioCommand::SetMix {
                backing_volume,
                voice_volume,
            } => {
                self.set_mix(backing_volume, voice_volume);
                Ok(())
            }
            StudioCommand::Download { path } => self.download(path).await,
            StudioCommand::SaveToFavorites => self.save_to_favorites().await,
            StudioCommand::Discard => {
                self.release_take();
                info!("Take discarded");
                Ok(())
            }
            StudioCommand::Shutdown => {
                self.shutdown();
                Ok(())
            }
        }
    }

    fn take_stage(&mut self) -> Stage {
        std::mem::replace(&mut self.stage, Stage::Idle)
    }

    /// Stop any preview and drop the take. The studio is idle afterwards.
    fn release_take(&mut self) {
        if let Stage::Ready { voice, preview } = self.take_stage() {
            if let Some(preview) = preview {
                preview.stop(self.devices.track.as_mut());
            }
            drop(voice);
        }
    }

    fn begin_countdown(&mut self) {
        self.release_take();
        let task = spawn_countdown(self.events.clone(), COUNTDOWN_FROM, COUNTDOWN_TICK);
        self.stage = Stage::CountingDown {
            remaining: COUNTDOWN_FROM,
            task,
        };
        info!("Countdown started");
    }

    fn start_recording(&mut self) -> Result<(), StudioError> {
        // The stage is idle from here on unless the session starts.
        if let Stage::CountingDown { task, .. } = self.take_stage() {
            task.abort();
        }

        let session =
            RecordingSession::start(self.devices.mic.as_mut(), self.devices.track.as_mut())?;
        self.stage = Stage::Recording {
            session,
            started_at: Utc::now(),
        };
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), StudioError> {
        let Stage::Recording { session, .. } = self.take_stage() else {
            return Ok(());
        };

        let voice = session.stop(self.devices.track.as_mut())?;
        self.stage = Stage::Ready {
            voice,
            preview: None,
        };
        Ok(())
    }

    async fn toggle_preview(&mut self) -> Result<(), StudioError> {
        let Stage::Ready { voice, preview } = &mut self.stage else {
            return Ok(());
        };

        if let Some(running) = preview.take() {
            running.stop(self.devices.track.as_mut());
            return Ok(());
        }

        self.preview_generation += 1;
        let generation = self.preview_generation;
        let (started, ended) = MixPreview::start(
            generation,
            voice,
            self.devices.sink.as_ref(),
            self.devices.track.as_mut(),
            self.params,
        )
        .await?;
        *preview = Some(started);

        let events = self.events.clone();
        tokio::spawn(async move {
            if ended.await.is_ok() {
                let _ = events.send(StudioCommand::PreviewEnded(generation)).await;
            }
        });
        Ok(())
    }

    fn finish_preview(&mut self, generation: u64) {
        if let Stage::Ready { preview, .. } = &mut self.stage {
            match preview.take() {
                Some(running) if running.generation() == generation => {
                    info!(
                        "Preview {} reached the end of the {:.1}s take",
                        generation,
                        running.voice_duration().as_secs_f64()
                    );
                    running.stop(self.devices.track.as_mut());
                }
                other => {
                    debug!("Ignoring end of stale preview {}", generation);
                    *preview = other;
                }
            }
        }
    }

    fn stop_preview(&mut self) {
        if let Stage::Ready { preview, .. } = &mut self.stage {
            if let Some(running) = preview.take() {
                running.stop(self.devices.track.as_mut());
            }
        }
    }

    fn set_mix(&mut self, backing_volume: Option<f32>, voice_volume: Option<f32>) {
        if let Some(volume) = backing_volume {
            self.params.set_backing_volume(volume);
        }
        if let Some(volume) = voice_volume {
            self.params.set_voice_volume(volume);
        }
        debug!(
            "Mix set to backing {:.2}, voice {:.2}",
            self.params.backing_volume(),
            self.params.voice_volume()
        );

        match &self.stage {
            Stage::Ready {
                preview: Some(running),
                ..
            } => {
                self.devices
                    .track
                    .set_volume(self.params.backing_volume());
                running.set_voice_volume(self.params.voice_volume());
            }
            Stage::Recording { .. } => {}
            _ => self.devices.track.set_volume(MONITORING_VOLUME),
        }
    }

    async fn render_take(&self) -> Result<RenderedMix, StudioError> {
        let Stage::Ready { voice, .. } = &self.stage else {
            return Err(StudioError::MissingVoice);
        };
        self.renderer
            .render(self.devices.track.source(), voice, self.params)
            .await
    }

    async fn download(&mut self, path: Option<PathBuf>) -> Result<(), StudioError> {
        self.stop_preview();
        let target = path.unwrap_or_else(|| {
            self.options
                .download_dir
                .join(&self.options.download_file_name)
        });

        self.status.set_phase(StudioPhase::Rendering).await;
        let mix = self.render_take().await?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &mix.bytes).await?;
        info!("Mix written to {:?} ({} bytes)", target, mix.bytes.len());

        self.status
            .update(|status| status.last_download = Some(target))
            .await;
        Ok(())
    }

    async fn save_to_favorites(&mut self) -> Result<(), StudioError> {
        let song = self.options.song.clone().ok_or(StudioError::MissingSong)?;
        let uploader = self
            .uploader
            .clone()
            .ok_or_else(|| StudioError::Upload("no music backend is configured".to_string()))?;
        self.stop_preview();

        self.status.set_phase(StudioPhase::Saving).await;
        let mix = self.render_take().await?;

        let receipt = uploader
            .upload_mix(mix.bytes, song.id)
            .await
            .map_err(|e| StudioError::Upload(format!("{e:#}")))?;
        info!("Mix saved to favorites for song {}", song.id);

        let saved = SavedMix {
            original_song_id: song.id,
            saved_at: Utc::now(),
            message: receipt.message,
            redirect: SAVED_MIX_REDIRECT.to_string(),
        };
        self.status
            .update(|status| status.last_saved = Some(saved))
            .await;
        Ok(())
    }

    fn shutdown(&mut self) {
        match self.take_stage() {
            Stage::Idle => {}
            Stage::CountingDown { task, .. } => task.abort(),
            Stage::Recording { session, .. } => {
                session.abort(self.devices.track.as_mut())
            }
            Stage::Ready { voice, preview } => {
                if let Some(preview) = preview {
                    preview.stop(self.devices.track.as_mut());
                }
                drop(voice);
            }
        }
        self.devices.track.pause();
        self.devices.track.rewind();
    }

    async fn sync_status(&self) {
        let phase = self.phase();
        let countdown = match &self.stage {
            Stage::CountingDown { remaining, .. } => Some(*remaining),
            _ => None,
        };
        let recording_started_at = match &self.stage {
            Stage::Recording { started_at, .. } => Some(*started_at),
            _ => None,
        };
        let voice = self.voice();
        let params = self.params;
        let song = self.options.song.clone();

        self.status
            .update(move |status| {
                status.phase = phase;
                status.countdown = countdown;
                status.recording_started_at = recording_started_at;
                status.voice = voice;
                status.params = params;
                status.song = song;
            })
            .await;
    }
}

#[cfg(test)]
impl Studio {
    /// Replace the current take, as if it had just been recorded.
    pub(super) fn insert_take(&mut self, voice: VoiceRecording) {
        self.release_take();
        self.stage = Stage::Ready {
            voice,
            preview: None,
        };
    }
}

/// The state machine action a command is subject to. `None` for commands that
/// are valid in every phase.
fn action_for(command: &StudioCommand) -> Option<Action> {
    match command {
        StudioCommand::Record => Some(Action::Start),
        StudioCommand::AutoStart => Some(Action::AutoStart),
        StudioCommand::Stop => Some(Action::Stop),
        StudioCommand::TogglePreview => Some(Action::TogglePreview),
        StudioCommand::Download { .. } => Some(Action::Download),
        StudioCommand::SaveToFavorites => Some(Action::Save),
        StudioCommand::Discard => Some(Action::Discard),
        StudioCommand::CountdownTick(_) | StudioCommand::CountdownElapsed => {
            Some(Action::CountdownTick)
        }
        StudioCommand::PreviewEnded(_) => Some(Action::PreviewEnded),
        StudioCommand::SetMix { .. } | StudioCommand::Shutdown => None,
    }
}

fn is_user_command(command: &StudioCommand) -> bool {
    !matches!(
        command,
        StudioCommand::CountdownTick(_)
            | StudioCommand::CountdownElapsed
            | StudioCommand::PreviewEnded(_)
            | StudioCommand::Shutdown
    )
}
