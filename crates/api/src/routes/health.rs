use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when a configured backend is unreachable.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// `None` when scenes are kept in memory.
    pub db_healthy: Option<bool>,
    /// `None` when vectors are kept in memory.
    pub vector_store_healthy: Option<bool>,
}

/// GET /health -- returns service and backend health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.pool {
        Some(pool) => Some(reelsearch_db::health_check(pool).await.is_ok()),
        None => None,
    };
    let vector_store_healthy = match &state.chroma {
        Some(chroma) => Some(chroma.heartbeat().await.is_ok()),
        None => None,
    };

    let degraded = db_healthy == Some(false) || vector_store_healthy == Some(false);
    let status = if degraded { "degraded" } else { "ok" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        vector_store_healthy,
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
