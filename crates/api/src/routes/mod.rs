pub mod health;
pub mod scenes;
pub mod search;
pub mod videos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /scenes/index            index scenes (POST)
/// /videos?source_path=     remove a source video (DELETE)
/// /search                  text and filter search (POST)
/// /search/image            image search, multipart (POST)
/// /search/similar          similar scenes (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/scenes", scenes::router())
        .nest("/videos", videos::router())
        .nest("/search", search::router())
}
