//! Error types for the document store.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection to the backend was reset mid-request.
    ///
    /// This is the only error the adapter retries.
    #[error("stream reset: {0}")]
    StreamReset(String),

    /// Document not found (raised by updates).
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Document could not be interpreted.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Query could not be executed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is the transient stream-reset condition.
    pub fn is_stream_reset(&self) -> bool {
        matches!(self, Self::StreamReset(_))
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read a document file.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write a document file.
    #[error("failed to write file: {0}")]
    WriteFile(String),

    /// Failed to delete a document file.
    #[error("failed to delete file: {0}")]
    DeleteFile(String),
}
