//! API error handling
//!
//! Errors leave the server as a status code with a short plain-text body.
//! Internal causes (database, hashing, signing) are logged, never sent.

use crate::auth::AuthServiceError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub const BAD_REQUEST_MESSAGE: &str = "некорректный запрос";

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Auth(AuthServiceError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthServiceError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthServiceError::UserNotFound) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::BadRequest(msg) => msg,
            AppError::Auth(err) => {
                if status.is_server_error() {
                    let cause = std::error::Error::source(&err)
                        .map(|s| s.to_string())
                        .unwrap_or_default();
                    tracing::error!(error = %err, cause = %cause, "Authentication failed");
                }
                err.to_string()
            }
        };

        (status, body).into_response()
    }
}

impl From<AuthServiceError> for AppError {
    fn from(err: AuthServiceError) -> Self {
        AppError::Auth(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::BadRequest(BAD_REQUEST_MESSAGE.to_string())
    }
}
