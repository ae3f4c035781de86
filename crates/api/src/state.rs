use std::sync::Arc;

use reelsearch_db::DbPool;
use reelsearch_search::RetrievalEngine;
use reelsearch_vectors::chroma::ChromaApi;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RetrievalEngine>,
    pub config: Arc<ServerConfig>,
    /// Present when scenes are persisted in Postgres.
    pub pool: Option<DbPool>,
    /// Present when vectors live in a Chroma server.
    pub chroma: Option<Arc<ChromaApi>>,
}
