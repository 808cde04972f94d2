use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::repository::RepoError;

/// ApiError
///
/// The application's HTTP error taxonomy. Every handler returns `Result<_, ApiError>`,
/// and the `IntoResponse` implementation renders each variant as the matching status
/// code with an `{ "error": "<message>" }` JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: missing, invalid, or expired credentials, or a deactivated account.
    #[error("{0}")]
    Unauthorized(String),
    /// 403: the caller is authenticated but lacks the role or ownership required.
    #[error("{0}")]
    Forbidden(String),
    /// 400: the path id is not a well-formed identifier. Checked before any store access.
    #[error("Invalid post ID")]
    InvalidId,
    /// 404: the requested resource (or route) does not exist.
    #[error("{0}")]
    NotFound(String),
    /// 400: missing/empty required fields or otherwise rejected input.
    #[error("{0}")]
    Validation(String),
    /// 500: unexpected infrastructure failure. The detail is logged, never leaked.
    #[error("Server error")]
    Internal,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidId | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            // A title collision is a client error, reported with the same message
            // regardless of whether it surfaced on create or update.
            RepoError::DuplicateTitle => {
                ApiError::Validation("Post with this title already exists".to_string())
            }
            RepoError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                ApiError::Internal
            }
        }
    }
}
