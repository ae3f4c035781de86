use axum::routing::post;
use axum::Router;

use crate::handlers::scenes;
use crate::state::AppState;

/// Routes mounted at `/scenes`.
///
/// ```text
/// POST   /index                    index_scenes
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/index", post(scenes::index_scenes))
}
