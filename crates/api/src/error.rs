use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reelsearch_core::error::CoreError;
use reelsearch_embed::EmbedError;
use reelsearch_search::SearchError;
use reelsearch_vectors::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core(core),
            AppError::Search(SearchError::Core(core)) => classify_core(core),
            AppError::Search(SearchError::Embed(err)) => classify_embed(err),
            AppError::Search(SearchError::Store(err)) => classify_store(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core(err: &CoreError) -> Classified {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Internal(msg) => internal(msg),
    }
}

fn classify_embed(err: &EmbedError) -> Classified {
    match err {
        EmbedError::ModelLoad { .. } => {
            tracing::error!(error = %err, "Model unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODEL_UNAVAILABLE",
                err.to_string(),
            )
        }
        EmbedError::Decode(msg) => (StatusCode::BAD_REQUEST, "INVALID_MEDIA", msg.clone()),
        other => internal(&other.to_string()),
    }
}

fn classify_store(err: &StoreError) -> Classified {
    match err {
        StoreError::NotInitialized(_) => {
            tracing::error!(error = %err, "Vector store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                err.to_string(),
            )
        }
        StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        other => internal(&other.to_string()),
    }
}

fn internal(msg: &str) -> Classified {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
