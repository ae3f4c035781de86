use axum::routing::delete;
use axum::Router;

use crate::handlers::scenes;
use crate::state::AppState;

/// Routes mounted at `/videos`.
///
/// ```text
/// DELETE /?source_path=            remove_video
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", delete(scenes::remove_video))
}
