//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?source_path=` for endpoints scoped to one source video.
#[derive(Debug, Deserialize)]
pub struct SourcePathParams {
    pub source_path: String,
}
