use axum::{extract::State, Json};
use mediaserver_api::models::{MediaServerItem, MediaServerLibrary, MediaServerPlayItem};
use mediaserver_api::ItemFilter;
use serde::Deserialize;
use tracing::debug;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    extract::AppQuery,
    AppState,
};

fn default_latest_count() -> u32 {
    18
}

fn default_playing_count() -> u32 {
    12
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub server: String,
    #[serde(default = "default_latest_count")]
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlayingQuery {
    pub server: String,
    #[serde(default = "default_playing_count")]
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    pub server: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub server: String,
    pub parent_id: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub is_played: Option<bool>,
    pub resume: Option<bool>,
    #[serde(default)]
    pub start_index: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl ItemsQuery {
    fn filter(&self) -> ItemFilter {
        ItemFilter::new(self.parent_id.clone())
            .with_title(self.title.clone())
            .with_year(self.year.clone())
            .with_played(self.is_played)
            .with_resume(self.resume)
            .with_page(self.start_index, self.limit)
    }
}

pub async fn latest(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppQuery(query): AppQuery<LatestQuery>,
) -> AppResult<Json<Vec<MediaServerPlayItem>>> {
    let items = state
        .media_server_chain
        .latest(&query.server, query.count, &user.username)
        .await?;
    Ok(Json(items.unwrap_or_default()))
}

pub async fn playing(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppQuery(query): AppQuery<PlayingQuery>,
) -> AppResult<Json<Vec<MediaServerPlayItem>>> {
    let items = state
        .media_server_chain
        .playing(&query.server, query.count, &user.username)
        .await?;
    Ok(Json(items.unwrap_or_default()))
}

pub async fn library(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppQuery(query): AppQuery<LibraryQuery>,
) -> AppResult<Json<Vec<MediaServerLibrary>>> {
    let libraries = state
        .media_server_chain
        .librarys(&query.server, &user.username, query.hidden)
        .await?;
    Ok(Json(libraries.unwrap_or_default()))
}

/// Paged listing of one library on one server.
pub async fn items(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppQuery(query): AppQuery<ItemsQuery>,
) -> AppResult<Json<Vec<MediaServerItem>>> {
    let filter = query.filter();
    debug!(
        "Listing items on {} for {} (parent {:?}, window {}+{})",
        query.server, user.username, filter.parent_id, filter.start_index, filter.limit
    );
    let items = state
        .media_server_chain
        .items(&query.server, &user.username, &filter)
        .await?;
    Ok(Json(items.unwrap_or_default()))
}
