//! Application state management

use crate::auth::{AuthService, JwtConfig, PasswordConfig};
use merchio_core::config::AppConfig;
use merchio_core::UserRepository;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Server start time
    pub start_time: Instant,
    /// Authenticate-or-register and token verification
    pub auth: AuthService,
}

impl AppState {
    /// Create application state with production password hashing
    pub fn new(config: &AppConfig, users: Arc<dyn UserRepository>) -> Self {
        Self::with_password_config(config, users, PasswordConfig::default())
    }

    /// Create application state with explicit Argon2 parameters
    pub fn with_password_config(
        config: &AppConfig,
        users: Arc<dyn UserRepository>,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            auth: AuthService::new(users, JwtConfig::from(&config.auth), password_config),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
