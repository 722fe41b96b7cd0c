//! API route definitions

use crate::auth::session_guard;
use crate::handlers::{auth, health, user};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::auth_handler,
        user::me_handler,
    ),
    components(schemas(
        health::HealthResponse,
        auth::AuthRequest,
        auth::AuthResponse,
        user::ProfileResponse,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Authentication and session tokens"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create API routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new().route("/auth", post(auth::auth_handler));

    // Protected routes (session token required)
    let protected_routes = Router::new()
        .route("/me", get(user::me_handler))
        .route_layer(middleware::from_fn_with_state(state, session_guard));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health routes
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health::health_check))
}
