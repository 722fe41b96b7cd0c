//! Profile of the authenticated caller

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use merchio_core::UserPublic;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Profile response
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub coins: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserPublic> for ProfileResponse {
    fn from(user: UserPublic) -> Self {
        Self {
            id: user.id,
            username: user.username,
            coins: user.coins,
            created_at: user.created_at,
        }
    }
}

/// Get current user info
///
/// Requires a session token in the `Authorization` header.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token", body = String),
        (status = 404, description = "Token subject no longer exists", body = String),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth.profile(user.user_id).await?;

    Ok(Json(ProfileResponse::from(profile)))
}
