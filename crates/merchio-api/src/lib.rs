//! merchio API - HTTP server
//!
//! Exposes authenticate-or-register at `POST /api/auth` and a token-guarded
//! profile at `GET /api/me`. Swagger UI is served at `/swagger-ui`.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        .merge(routes::health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", routes::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Signing secret used by the testing routers
#[cfg(feature = "test-utils")]
pub const TEST_JWT_SECRET: &str = "merchio-test-secret";

/// Router over an empty in-memory store, for integration tests
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    create_router_with_store(Arc::new(merchio_core::InMemoryUserStore::new()))
}

/// Router over the given store with cheap password hashing
#[cfg(feature = "test-utils")]
pub fn create_router_with_store(users: Arc<dyn merchio_core::UserRepository>) -> Router {
    let mut config = merchio_core::AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();

    let state = AppState::with_password_config(&config, users, auth::PasswordConfig::light());
    create_router(Arc::new(state))
}
