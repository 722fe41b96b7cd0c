//! Authentication module
//!
//! This module provides token-based authentication with the following components:
//! - Session token issuance and verification (HS256 JWT)
//! - Password hashing with Argon2
//! - Session guard middleware for protected routes
//! - Authentication service: authenticate-or-register

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{issue_token, verify_token, JwtConfig, JwtError, SessionClaims};
pub use middleware::{session_guard, AuthenticatedUser, SessionError};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{AuthOutcome, AuthService, AuthServiceError};
