use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub mod existence;
pub mod library;
pub mod playback;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/play/", get(playback::play_item_missing))
        .route("/play/{item_id}", get(playback::play_item))
        .route("/exists", get(existence::exists_local))
        .route("/exists_remote", post(existence::exists_remote))
        .route("/notexists", post(existence::not_exists))
        .route("/latest", get(library::latest))
        .route("/playing", get(library::playing))
        .route("/library", get(library::library))
        .route("/items", get(library::items))
}
