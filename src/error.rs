use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::dto::Envelope;

/// Failures raised below the HTTP layer, by the user repository and the
/// password hasher.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),
    #[error("This username is already in use.")]
    UsernameTaken,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Everything a handler can answer with when it does not succeed. Each
/// variant owns its status code and its client-facing message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("This username is already in use.")]
    UsernameTaken,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("Authentication required.")]
    AuthRequired,
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(message) => ApiError::Validation(message),
            UserError::UsernameTaken => ApiError::UsernameTaken,
            UserError::Store(err) => ApiError::Internal(err),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UsernameTaken => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::AuthRequired => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details go to the log, never into the response body.
        if let ApiError::Internal(err) = &self {
            tracing::error!(error = ?err, "request failed");
        }
        (self.status(), Json(Envelope::error(self.to_string()))).into_response()
    }
}
