// Crate-wide error type: every policy violation a caller can trigger,
// plus the storage failure case.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Actor lacks the required role or ownership.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Name collision within the relevant scope.
    #[error("{0}")]
    DuplicateName(&'static str),

    /// Tournament team count is at or above max_teams.
    #[error("Tournament is full")]
    CapacityExceeded,

    /// Group assignment attempted before the tournament filled up.
    #[error("Tournament is not full yet. Current teams: {current}, Max teams: {max}")]
    NotFull { current: i64, max: i64 },

    /// Group assignment attempted while groups already exist.
    #[error("Groups have already been created for this tournament")]
    AlreadyAssigned,

    /// Requested group count outside [2, team count].
    #[error("Number of groups must be between 2 and {max}")]
    InvalidGroupCount { max: usize },

    /// Login failure. Deliberately does not distinguish unknown user,
    /// wrong password, and deactivated account.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Malformed request payload.
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Hashing or token failure. Details are logged where they occur.
    #[error("Internal error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateName(_)
            | ApiError::CapacityExceeded
            | ApiError::NotFull { .. }
            | ApiError::AlreadyAssigned => StatusCode::CONFLICT,
            ApiError::InvalidGroupCount { .. } | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message. Storage errors are sanitized.
    fn client_message(&self) -> String {
        match self {
            ApiError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(e) = &self {
            tracing::error!("Database error: {e}");
        }
        (
            self.status_code(),
            Json(json!({ "error": self.client_message() })),
        )
            .into_response()
    }
}
