use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, warn};

use crate::{
    error::AppResult,
    models::{ApiResponse, PlayUrl},
    AppState,
};

pub const MSG_INVALID_ITEM: &str = "Invalid item id";
pub const MSG_NO_MEDIA_SERVER: &str = "No media server configured";
pub const MSG_NO_PLAY_URL: &str = "No play URL found for this item";

// GET /play/{item_id}, no token required
pub async fn play_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<ApiResponse<PlayUrl>>> {
    resolve_play_url(&state, &item_id).await.map(Json)
}

// GET /play/ with the id left out
pub async fn play_item_missing(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<PlayUrl>>> {
    resolve_play_url(&state, "").await.map(Json)
}

pub async fn resolve_play_url(state: &AppState, item_id: &str) -> AppResult<ApiResponse<PlayUrl>> {
    let item_id = item_id.trim();
    if item_id.is_empty() {
        return Ok(ApiResponse::fail(MSG_INVALID_ITEM));
    }

    let Some(server) = state.primary_media_server().await else {
        warn!("Play link requested for {} without a configured media server", item_id);
        return Ok(ApiResponse::fail(MSG_NO_MEDIA_SERVER));
    };

    match state.media_server_chain.get_play_url(&server, item_id).await? {
        Some(url) => {
            debug!("Resolved play link for {} on {}: {}", item_id, server, url);
            Ok(ApiResponse::ok(PlayUrl { url }))
        }
        None => Ok(ApiResponse::fail(MSG_NO_PLAY_URL)),
    }
}
