use std::time::Duration;

/// Errors from model loading and embedding generation.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// A model could not be loaded. Fatal for its role; never retried.
    #[error("Failed to load model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Embedding timed out after {0:?}")]
    Timeout(Duration),

    /// The extractor ran but reported a failure.
    #[error("Extractor error: {0}")]
    Extractor(String),

    /// Input bytes or files could not be decoded.
    #[error("Failed to decode input: {0}")]
    Decode(String),

    /// The output could not be normalized (zero or non-finite norm).
    #[error("Degenerate embedding: {0}")]
    Degenerate(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}
