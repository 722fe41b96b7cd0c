//! Session guard for protected routes
//!
//! Extracts the session token from the Authorization header and verifies it.
//! On success the caller's identity is added to request extensions as
//! [`AuthenticatedUser`]; otherwise the request is answered with 401 and the
//! wrapped handler never runs.
use super::jwt::SessionClaims;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;

/// Verified identity of the caller
///
/// Extract in handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

impl From<SessionClaims> for AuthenticatedUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
        }
    }
}

/// Session guard errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("отсутствует токен")]
    MissingToken,

    #[error("недействительный токен")]
    InvalidToken,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
///
/// The `Bearer ` prefix is optional; a bare token is accepted as is.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, SessionError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(SessionError::MissingToken),
    };

    let value = value.to_str().map_err(|_| SessionError::InvalidToken)?;
    Ok(value.strip_prefix("Bearer ").unwrap_or(value))
}

/// Middleware that requires a valid session token
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use merchio_api::auth::middleware::session_guard;
///
/// let app = Router::new()
///     .route("/api/me", get(me_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), session_guard));
/// ```
pub async fn session_guard(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, SessionError> {
    let result = extract_bearer_token(request.headers()).and_then(|token| {
        state.auth.verify_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            SessionError::InvalidToken
        })
    });

    let claims = match result {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
                reason: e.to_string(),
            });
            return Err(e);
        }
    };

    request.extensions_mut().insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}
