//! Error types for reference and mention tracking.

use thiserror::Error;

/// Result type alias for mention operations.
pub type Result<T> = std::result::Result<T, MentionError>;

/// Errors that can occur while tracking references.
#[derive(Error, Debug)]
pub enum MentionError {
    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] warbook_store::StoreError),

    /// Policy configuration is invalid.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Reference is not allowed by the policy.
    #[error("{source_collection} may not refer to {target_collection}")]
    ReferenceNotAllowed {
        source_collection: String,
        target_collection: String,
    },

    /// Entity has not been saved yet.
    #[error("entity has no id")]
    Unsaved,
}
