//! Handlers for indexing scenes and removing source videos.

use axum::extract::{Query, State};
use axum::Json;
use reelsearch_search::{IndexReport, IndexRequest, RemovalReport};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::query::SourcePathParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IndexBody {
    pub scenes: Vec<IndexRequest>,
}

/// POST /api/v1/scenes/index
///
/// Chunk write failures are reported in the body, not as an error status.
pub async fn index_scenes(
    State(state): State<AppState>,
    Json(body): Json<IndexBody>,
) -> AppResult<Json<DataResponse<IndexReport>>> {
    let report = state.engine.index_scenes(body.scenes).await?;
    Ok(Json(DataResponse { data: report }))
}

/// DELETE /api/v1/videos?source_path=
pub async fn remove_video(
    State(state): State<AppState>,
    Query(params): Query<SourcePathParams>,
) -> AppResult<Json<DataResponse<RemovalReport>>> {
    let source_path = params.source_path.trim();
    if source_path.is_empty() {
        return Err(AppError::BadRequest("source_path must not be empty".into()));
    }
    let report = state.engine.remove_source(source_path).await?;
    Ok(Json(DataResponse { data: report }))
}
