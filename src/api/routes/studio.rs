//! Studio control endpoints.
//!
//! Every control call forwards a command to the studio loop and answers with
//! the status shortly afterwards. Renders and uploads run in the loop, so the
//! answer to a download or save usually reports the busy phase; poll
//! `GET /studio/status` to see the outcome.

use crate::api::error::{ApiError, ApiResult};
use crate::studio::{StudioCommand, StudioStatus, StudioStatusHandle};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// How long to wait for the loop to publish before answering.
const STATUS_SETTLE: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct StudioState {
    pub tx: mpsc::Sender<StudioCommand>,
    pub status: StudioStatusHandle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MixRequest {
    #[serde(default)]
    pub backing_volume: Option<f32>,
    #[serde(default)]
    pub voice_volume: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Output file. Defaults to the configured download location.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: StudioStatus,
    pub recording_seconds: Option<u64>,
}

impl From<StudioStatus> for StatusResponse {
    fn from(status: StudioStatus) -> Self {
        Self {
            recording_seconds: status.recording_seconds(),
            status,
        }
    }
}

pub fn router(state: StudioState) -> Router {
    Router::new()
        .route("/status", get(studio_status))
        .route("/record", post(record))
        .route("/stop", post(stop))
        .route("/preview", post(toggle_preview))
        .route("/mix", put(set_mix))
        .route("/download", post(download))
        .route("/save", post(save))
        .route("/discard", post(discard))
        .with_state(state)
}

async fn send_command(state: &StudioState, command: StudioCommand) -> ApiResult<Json<StatusResponse>> {
    let phase = state.status.get().await.phase;
    if phase.is_busy() {
        return Err(ApiError::conflict(format!(
            "Studio is busy ({})",
            phase.as_str()
        )));
    }

    info!("{:?} command received via API", command);
    state.tx.send(command).await.map_err(|e| {
        error!("Failed to send studio command: {}", e);
        ApiError::internal("Studio is not running")
    })?;

    tokio::time::sleep(STATUS_SETTLE).await;
    Ok(Json(state.status.get().await.into()))
}

/// GET /studio/status
async fn studio_status(State(state): State<StudioState>) -> Json<StatusResponse> {
    Json(state.status.get().await.into())
}

/// POST /studio/record - Count down and start recording over the backing track.
async fn record(State(state): State<StudioState>) -> ApiResult<Json<StatusResponse>> {
    send_command(&state, StudioCommand::Record).await
}

/// POST /studio/stop
async fn stop(State(state): State<StudioState>) -> ApiResult<Json<StatusResponse>> {
    send_command(&state, StudioCommand::Stop).await
}

/// POST /studio/preview - Start or stop the remix preview.
async fn toggle_preview(State(state): State<StudioState>) -> ApiResult<Json<StatusResponse>> {
    send_command(&state, StudioCommand::TogglePreview).await
}

/// PUT /studio/mix - Change the backing and/or voice volume.
async fn set_mix(
    State(state): State<StudioState>,
    Json(request): Json<MixRequest>,
) -> ApiResult<Json<StatusResponse>> {
    if request.backing_volume.is_none() && request.voice_volume.is_none() {
        return Err(ApiError::bad_request(
            "Provide backing_volume and/or voice_volume",
        ));
    }
    send_command(
        &state,
        StudioCommand::SetMix {
            backing_volume: request.backing_volume,
            voice_volume: request.voice_volume,
        },
    )
    .await
}

/// POST /studio/download - Render the mix and write it to disk.
async fn download(
    State(state): State<StudioState>,
    body: Option<Json<DownloadRequest>>,
) -> ApiResult<Json<StatusResponse>> {
    let path = body.and_then(|Json(req)| req.path);
    send_command(&state, StudioCommand::Download { path }).await
}

/// POST /studio/save - Render the mix and store it in favorites.
async fn save(State(state): State<StudioState>) -> ApiResult<Json<StatusResponse>> {
    send_command(&state, StudioCommand::SaveToFavorites).await
}

/// POST /studio/discard - Throw the take away.
async fn discard(State(state): State<StudioState>) -> ApiResult<Json<StatusResponse>> {
    send_command(&state, StudioCommand::Discard).await
}
