//! Client for the music backend: lists favorite songs and stores rendered mixes.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::audio::WAV_MIME;
use crate::config::ApiConfig;

/// File name the backend sees for an uploaded mix.
pub const UPLOAD_FILE_NAME: &str = "mix.wav";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FavoriteSong {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub tags: Option<String>,
    pub audio_url: String,
    #[serde(default)]
    pub favorited_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// What the backend answered to an upload. The body is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "message")]
    error: String,
}

/// Destination for rendered mixes.
#[async_trait]
pub trait MixUploader: Send + Sync {
    async fn upload_mix(&self, wav: Vec<u8>, original_song_id: i64) -> Result<UploadReceipt>;
}

pub struct FavoritesClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl FavoritesClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Initialized music backend client for {}", base_url);
        Self {
            client,
            base_url,
            token,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ApiConfig) -> Self {
        Self::new(client, config.base_url.clone(), config.token.clone())
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Absolute URL for an `audio_url` that the backend returned relative to
    /// its own origin.
    pub fn resolve_audio_url(&self, audio_url: &str) -> String {
        if audio_url.starts_with("http://") || audio_url.starts_with("https://") {
            return audio_url.to_string();
        }
        let origin = match self.base_url.find("://") {
            Some(scheme_end) => {
                let host_start = scheme_end + 3;
                match self.base_url[host_start..].find('/') {
                    Some(path_start) => &self.base_url[..host_start + path_start],
                    None => self.base_url.as_str(),
                }
            }
            None => self.base_url.as_str(),
        };
        format!("{}/{}", origin, audio_url.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn list_favorites(&self) -> Result<Vec<FavoriteSong>> {
        let url = self.endpoint("music/favorites");
        debug!("Fetching favorites from {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .context("Failed to reach the music backend")?;

        let body = read_success_body(response).await?;
        let favorites = parse_favorites(&body)?;
        info!("Fetched {} favorites", favorites.len());
        Ok(favorites)
    }
}

#[async_trait]
impl MixUploader for FavoritesClient {
    async fn upload_mix(&self, wav: Vec<u8>, original_song_id: i64) -> Result<UploadReceipt> {
        let url = self.endpoint("music/upload_mix");
        info!(
            "Uploading mix ({} bytes) for song {} to {}",
            wav.len(),
            original_song_id,
            url
        );

        let file = Part::bytes(wav)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(WAV_MIME)
            .context("Invalid mix content type")?;
        let form = Form::new()
            .part("file", file)
            .text("original_song_id", original_song_id.to_string());

        let response = self
            .authorize(self.client.post(&url).multipart(form))
            .send()
            .await
            .context("Failed to reach the music backend")?;

        let body = read_success_body(response).await?;
        Ok(parse_receipt(&body))
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    if !status.is_success() {
        error!("Music backend request failed with status {}: {}", status, body);
        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&body) {
            return Err(anyhow!(
                "Music backend error ({}): {}",
                status,
                error_response.error
            ));
        }
        return Err(anyhow!("Music backend request failed with status {}", status));
    }

    Ok(body)
}

fn parse_favorites(body: &str) -> Result<Vec<FavoriteSong>> {
    serde_json::from_str(body).context("Failed to parse favorites response")
}

fn parse_receipt(body: &str) -> UploadReceipt {
    if body.trim().is_empty() {
        return UploadReceipt::default();
    }
    serde_json::from_str(body).unwrap_or_else(|_| {
        debug!("Upload response is not JSON: {}", body);
        UploadReceipt::default()
    })
}
