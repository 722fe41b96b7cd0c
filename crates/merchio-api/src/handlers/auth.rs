//! Authentication API handler
//!
//! One endpoint serves both signup and login: the first request for a
//! username creates the account, later requests must present the same
//! password.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::AuthServiceError;
use crate::error::{AppError, BAD_REQUEST_MESSAGE};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Credentials submitted to `/api/auth`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AuthRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Issued session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

/// Authenticate or register
///
/// # Responses
///
/// * `200 OK` - Token issued
/// * `400 Bad Request` - Body is not JSON or a field is empty
/// * `401 Unauthorized` - Wrong password for an existing user
/// * `500 Internal Server Error` - Store, hashing or signing failure
#[utoipa::path(
    post,
    path = "/api/auth",
    tag = "auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 400, description = "Malformed request", body = String),
        (status = 401, description = "Wrong password", body = String),
        (status = 500, description = "Internal server error", body = String),
    )
)]
pub async fn auth_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    if let Err(e) = request.validate() {
        tracing::debug!(error = %e, "Invalid credentials payload");
        return Err(AppError::BadRequest(BAD_REQUEST_MESSAGE.to_string()));
    }

    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    match state
        .auth
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(outcome) => {
            if outcome.registered {
                audit_log(&AuditEvent::Registration {
                    user_id: outcome.user_id,
                    username: request.username.clone(),
                    ip_address: ip_address.clone(),
                    user_agent: user_agent.clone(),
                });
            }
            audit_log(&AuditEvent::LoginSuccess {
                user_id: outcome.user_id,
                username: request.username,
                ip_address,
                user_agent,
            });

            Ok(Json(AuthResponse {
                token: outcome.token,
            }))
        }
        Err(e) => {
            if matches!(e, AuthServiceError::InvalidCredentials) {
                audit_log(&AuditEvent::LoginFailure {
                    username: request.username,
                    reason: e.to_string(),
                    ip_address,
                    user_agent,
                });
            }
            Err(e.into())
        }
    }
}
