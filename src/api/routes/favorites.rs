//! Favorites listing, proxied from the music backend.

use crate::api::error::{ApiError, ApiResult};
use crate::favorites::{FavoriteSong, FavoritesClient};
use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;

pub fn router(client: Arc<FavoritesClient>) -> Router {
    Router::new()
        .route("/", get(list_favorites))
        .with_state(client)
}

/// GET /favorites - Songs the user marked as favorite, mixes included.
async fn list_favorites(
    State(client): State<Arc<FavoritesClient>>,
) -> ApiResult<Json<Vec<FavoriteSong>>> {
    let favorites = client
        .list_favorites()
        .await
        .map_err(|e| ApiError::bad_gateway(format!("{e:#}")))?;
    Ok(Json(favorites))
}
