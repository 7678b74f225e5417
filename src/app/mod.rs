#![allow(clippy::arc_with_non_send_sync)]

use crate::api::ApiServer;
use crate::audio::{DeviceSink, MicAudioSource, PlaybackSink, TrackPlayer, TrackSource};
use crate::config::Config;
use crate::favorites::{FavoritesClient, MixUploader};
use crate::studio::{
    OfflineMixRenderer, SongRef, Studio, StudioCommand, StudioDevices, StudioOptions,
    StudioStatusHandle,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Pause between the studio coming up and an automatic recording start.
pub const AUTO_START_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// URL or path of the backing track.
    pub track: String,
    pub song: Option<SongRef>,
    pub auto_start: bool,
}

pub async fn run_service(options: ServeOptions) -> Result<()> {
    info!("Starting karaoke studio");

    let config = Config::load()?;
    let client = reqwest::Client::new();

    let (tx, rx) = mpsc::channel::<StudioCommand>(32);

    let sink: Arc<dyn PlaybackSink> =
        Arc::new(DeviceSink::default_output().context("Failed to open the audio output")?);
    let source = TrackSource::parse(&options.track);
    let track = TrackPlayer::load(source, sink.clone(), &client).await?;

    let favorites = Arc::new(FavoritesClient::from_config(client.clone(), &config.api));
    if options.song.is_none() {
        warn!("No song id given; saving to favorites is disabled for this session");
    }

    let status = StudioStatusHandle::default();
    let studio = Studio::new(
        StudioDevices {
            mic: Box::new(MicAudioSource::new()),
            track: Box::new(track),
            sink,
        },
        OfflineMixRenderer::new(client),
        Some(favorites.clone() as Arc<dyn MixUploader>),
        StudioOptions {
            download_dir: config.studio.download_dir(),
            download_file_name: config.studio.download_file_name.clone(),
            params: config.studio.mix_parameters(),
            song: options.song,
        },
        status.clone(),
        tx.clone(),
    );

    let api_server = ApiServer::new(tx.clone(), status, Some(favorites), &config);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    if options.auto_start {
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(AUTO_START_DELAY).await;
            let _ = tx.send(StudioCommand::AutoStart).await;
        });
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = tx.send(StudioCommand::Shutdown).await;
        }
    });

    info!("Karaoke studio is ready!");
    info!(
        "Try: curl -X POST http://127.0.0.1:{}/studio/record",
        config.server.port
    );

    studio.run(rx).await;

    Ok(())
}
