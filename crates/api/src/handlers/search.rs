//! Handlers for the `/search` resource.
//!
//! The engine is asked for `offset + limit` videos and the page is cut here,
//! so deeper pages re-rank the same candidate list. Only the first
//! [`MAX_SEARCH_LIMIT`] ranked videos are reachable: an offset past that is
//! a validation error and the last page may come back short.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use reelsearch_core::filters::SearchParams;
use reelsearch_core::fusion::paginate;
use reelsearch_core::scene::{ScoredScene, VideoWithScenes};
use reelsearch_core::search::{
    clamp_limit, validate_offset, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Resolve a page into `(offset, limit)` and the engine-side window size.
fn page(limit: Option<usize>, offset: Option<usize>) -> AppResult<(usize, usize, usize)> {
    let limit = clamp_limit(limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);
    let offset = validate_offset(offset, MAX_SEARCH_LIMIT)?;
    Ok((offset, limit, (offset + limit).min(MAX_SEARCH_LIMIT)))
}

// ---------------------------------------------------------------------------
// Text search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub params: SearchParams,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    #[serde(default)]
    pub strict: bool,
    pub scope: Option<Vec<String>>,
}

/// POST /api/v1/search
pub async fn search_scenes(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> AppResult<Json<DataResponse<Vec<VideoWithScenes>>>> {
    let (offset, limit, window) = page(body.limit.or(body.params.limit), body.offset)?;
    let videos = state
        .engine
        .search_scenes(&body.params, Some(window), body.strict, body.scope.as_deref())
        .await?;
    Ok(Json(DataResponse {
        data: paginate(videos, offset, limit),
    }))
}

// ---------------------------------------------------------------------------
// Image search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ImageSearchQuery {
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// POST /api/v1/search/image
///
/// Multipart parts: `image` (required, encoded image bytes) and `params`
/// (optional, a JSON [`SearchParams`]).
pub async fn search_by_image(
    State(state): State<AppState>,
    Query(query): Query<ImageSearchQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<Vec<VideoWithScenes>>>> {
    let mut image = None;
    let mut params = SearchParams::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("image") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                image = Some(bytes.to_vec());
            }
            Some("params") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                params = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::BadRequest(format!("Invalid params: {e}")))?;
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    let image = image
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'image' part".into()))?;

    let (offset, limit, window) = page(query.limit.or(params.limit), query.offset)?;
    let videos = state
        .engine
        .search_by_image(image, &params, Some(window), query.threshold)
        .await?;
    Ok(Json(DataResponse {
        data: paginate(videos, offset, limit),
    }))
}

// ---------------------------------------------------------------------------
// Similar scenes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SimilarBody {
    pub ids: Vec<String>,
    pub limit: Option<usize>,
    pub scope: Option<Vec<String>>,
}

/// POST /api/v1/search/similar
pub async fn similar_scenes(
    State(state): State<AppState>,
    Json(body): Json<SimilarBody>,
) -> AppResult<Json<DataResponse<Vec<ScoredScene>>>> {
    let scenes = state
        .engine
        .get_similar_scenes(&body.ids, body.limit, body.scope.as_deref())
        .await?;
    Ok(Json(DataResponse { data: scenes }))
}
