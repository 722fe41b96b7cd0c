//! merchio core - domain models, storage traits and shared types
//!
//! This crate defines the abstractions shared by the merchio services:
//! - User accounts and their public projection
//! - Common error types
//! - The credential store trait with PostgreSQL and in-memory backends
//! - Configuration management

pub mod config;
pub mod store;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use store::{InMemoryUserStore, PgUserStore, UserRepository};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coin balance granted to every account on creation
pub const STARTING_COINS: i64 = 1000;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for merchio operations
#[derive(Error, Debug)]
pub enum MerchError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type Result<T> = std::result::Result<T, MerchError>;

// ============================================================================
// Users
// ============================================================================

/// Store account: identity, credential and coin balance
///
/// `password_hash` holds an Argon2id PHC string and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Identifier assigned by the store
    pub id: i64,

    /// Unique login name
    pub username: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Current coin balance
    pub coins: i64,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Convert user to public representation (without the credential)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            coins: self.coins,
            created_at: self.created_at,
        }
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub coins: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            coins: STARTING_COINS,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"coins\":1000"));
    }

    #[test]
    fn test_user_to_public() {
        let user = sample_user();
        let public = user.to_public();

        assert_eq!(public.id, user.id);
        assert_eq!(public.username, user.username);
        assert_eq!(public.coins, user.coins);
        assert_eq!(public.created_at, user.created_at);
    }

    #[test]
    fn test_error_display() {
        let err = MerchError::NotFound("bob".to_string());
        assert_eq!(err.to_string(), "User not found: bob");
    }
}
