use thiserror::Error;

/// Errors that can occur during object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key is empty or would escape the store's namespace.
    #[error("invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The provided content hash is invalid.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// The object exceeds the configured size limit.
    #[error("object exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// Stored metadata for an object could not be decoded.
    #[error("corrupt metadata for '{key}': {source}")]
    CorruptMetadata {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The remote backend rejected or failed the request.
    #[error("object store backend error: {0}")]
    Backend(String),
}
