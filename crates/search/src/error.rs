use reelsearch_core::error::CoreError;
use reelsearch_embed::EmbedError;
use reelsearch_vectors::StoreError;

/// Errors from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
