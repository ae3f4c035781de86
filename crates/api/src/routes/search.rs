use axum::routing::post;
use axum::Router;

use crate::handlers::search;
use crate::state::AppState;

/// Routes mounted at `/search`.
///
/// ```text
/// POST   /                         search_scenes
/// POST   /image                    search_by_image (multipart)
/// POST   /similar                  similar_scenes
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(search::search_scenes))
        .route("/image", post(search::search_by_image))
        .route("/similar", post(search::similar_scenes))
}
