//! REST API server for the karaoke studio.
//!
//! Provides HTTP endpoints for:
//! - Studio control (record, stop, preview, mix, download, save, discard)
//! - Studio status
//! - Favorites listing

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::favorites::FavoritesClient;
use crate::studio::{StudioCommand, StudioStatusHandle};
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::studio::{DownloadRequest, MixRequest, StatusResponse, StudioState};

pub struct ApiServer {
    port: u16,
    studio_state: StudioState,
    favorites: Option<Arc<FavoritesClient>>,
}

impl ApiServer {
    pub fn new(
        tx: mpsc::Sender<StudioCommand>,
        status: StudioStatusHandle,
        favorites: Option<Arc<FavoritesClient>>,
        config: &Config,
    ) -> Self {
        Self {
            port: config.server.port,
            studio_state: StudioState { tx, status },
            favorites,
        }
    }

    pub fn router(self) -> Router {
        let mut app = Router::new()
            // Root and version endpoints
            .route("/", get(status))
            .route("/version", get(version))
            .nest("/studio", routes::studio::router(self.studio_state));

        if let Some(client) = self.favorites {
            app = app.nest("/favorites", routes::favorites::router(client));
        }

        app.layer(ServiceBuilder::new())
    }

    pub async fn start(self) -> Result<()> {
        let port = self.port;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", port)).await?;

        info!("API server listening on http://127.0.0.1:{}", port);
        info!("Endpoints:");
        info!("  GET  /                 - Service info");
        info!("  GET  /version          - Get version info");
        info!("  GET  /studio/status    - Get studio status");
        info!("  POST /studio/record    - Count down and record");
        info!("  POST /studio/stop      - Stop recording");
        info!("  POST /studio/preview   - Toggle remix preview");
        info!("  PUT  /studio/mix       - Set backing/voice volume");
        info!("  POST /studio/download  - Render mix to a WAV file");
        info!("  POST /studio/save      - Render mix and save to favorites");
        info!("  POST /studio/discard   - Discard the take");
        info!("  GET  /favorites        - List favorite songs");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "karaoke-studio",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "karaoke-studio"
    }))
}
