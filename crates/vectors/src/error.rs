/// Errors from the vector store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store returned a non-2xx status code.
    #[error("Vector store API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A batch was rejected before reaching the store.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The collection could not be created or looked up.
    #[error("Collection not initialized: {0}")]
    NotInitialized(String),

    /// The store answered with a body we could not interpret.
    #[error("Malformed store response: {0}")]
    Malformed(String),
}
