//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;
use warbook_mentions::MentionError;
use warbook_store::StoreError;

use crate::registry::ValidationError;

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("admin access required")]
    Forbidden,

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mention(#[from] MentionError),

    /// A save or delete that failed at the collection-state boundary.
    #[error("{0}")]
    Failed(String),
}

/// Result alias for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "authentication_error"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "permission_error"),
            Self::UnknownCollection(_) | Self::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "not_found_error")
            }
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            Self::Store(StoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found_error"),
            Self::Store(StoreError::InvalidDocument(_) | StoreError::InvalidQuery(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            Self::Mention(MentionError::ReferenceNotAllowed { .. } | MentionError::Unsaved) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            Self::Mention(MentionError::Store(StoreError::NotFound { .. })) => {
                (StatusCode::NOT_FOUND, "not_found_error")
            }
            Self::Store(_) | Self::Mention(_) | Self::Failed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        (
            status,
            Json(serde_json::json!({
                "error": {
                    "message": self.to_string(),
                    "type": error_type
                }
            })),
        )
            .into_response()
    }
}
