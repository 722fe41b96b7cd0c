//! Authentication service layer
//!
//! A single operation covers both signup and login: an unknown username is
//! registered with the supplied password, then the credentials are checked
//! and a session token is issued.

use super::jwt::{issue_token, verify_token, JwtConfig, JwtError, SessionClaims};
use super::password::{
    hash_password_blocking, verify_password_blocking, PasswordConfig, PasswordError,
};
use chrono::{DateTime, Utc};
use merchio_core::{MerchError, UserPublic, UserRepository};
use std::sync::Arc;
use thiserror::Error;

const USER_EXISTENCE: &str = "ошибка существования пользователя";
const USER_CREATION: &str = "ошибка создания пользователя";
const USER_LOOKUP: &str = "ошибка получения пользователя";

/// Authentication service errors
///
/// Display strings are safe to show to clients; the underlying cause is
/// kept as the error source.
#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("{context}")]
    Repository {
        context: &'static str,
        #[source]
        source: MerchError,
    },

    #[error("неверный пароль")]
    InvalidCredentials,

    #[error("ошибка хеширования пароля")]
    Hashing(#[source] PasswordError),

    #[error("ошибка генерации токена")]
    TokenIssuance(#[source] JwtError),

    #[error("пользователь не найден")]
    UserNotFound,
}

impl AuthServiceError {
    fn repository(context: &'static str, source: MerchError) -> Self {
        Self::Repository { context, source }
    }
}

/// Result of a successful authentication
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// Signed session token
    pub token: String,
    /// Authenticated user
    pub user_id: i64,
    /// The account was created by this call
    pub registered: bool,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: Arc<dyn UserRepository>,
        jwt_config: JwtConfig,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            users,
            jwt_config,
            password_config,
        }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    /// Authenticate, registering the user first if the username is unknown
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, AuthServiceError> {
        self.authenticate_at(username, password, Utc::now()).await
    }

    /// Same as [`AuthService::authenticate`] with an explicit clock
    pub async fn authenticate_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthOutcome, AuthServiceError> {
        let present = self
            .users
            .exists(username)
            .await
            .map_err(|e| AuthServiceError::repository(USER_EXISTENCE, e))?;

        let mut registered = false;
        if !present {
            // Store the hash, never the plaintext
            let password_hash =
                hash_password_blocking(password.to_string(), self.password_config.clone())
                    .await
                    .map_err(AuthServiceError::Hashing)?;

            match self.users.create(username, &password_hash).await {
                Ok(user_id) => {
                    registered = true;
                    tracing::info!(user_id, username, "Registered new user");
                }
                // Lost a race with a concurrent first login; the stored hash decides
                Err(MerchError::AlreadyExists(_)) => {
                    tracing::debug!(username, "User was created concurrently");
                }
                Err(e) => return Err(AuthServiceError::repository(USER_CREATION, e)),
            }
        }

        let user = self
            .users
            .find_by_username(username)
            .await
            .map_err(|e| AuthServiceError::repository(USER_LOOKUP, e))?;

        let verified = verify_password_blocking(password.to_string(), user.password_hash).await;
        if !password_matches(user.id, verified)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        let token =
            issue_token(&self.jwt_config, user.id, now).map_err(AuthServiceError::TokenIssuance)?;

        Ok(AuthOutcome {
            token,
            user_id: user.id,
            registered,
        })
    }

    /// Verify a session token against the configured secret
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, JwtError> {
        verify_token(&self.jwt_config, token, Utc::now())
    }

    /// Public profile of an authenticated user
    pub async fn profile(&self, user_id: i64) -> Result<UserPublic, AuthServiceError> {
        match self.users.find_by_id(user_id).await {
            Ok(user) => Ok(user.to_public()),
            Err(MerchError::NotFound(_)) => Err(AuthServiceError::UserNotFound),
            Err(e) => Err(AuthServiceError::repository(USER_LOOKUP, e)),
        }
    }
}

/// Interpret a verification result
///
/// An unparseable stored hash counts as a mismatch; any other verifier
/// failure is internal.
fn password_matches(
    user_id: i64,
    verified: Result<bool, PasswordError>,
) -> Result<bool, AuthServiceError> {
    match verified {
        Ok(valid) => Ok(valid),
        Err(PasswordError::InvalidHashFormat) => {
            tracing::warn!(user_id, "Stored password hash is unusable");
            Ok(false)
        }
        Err(e) => Err(AuthServiceError::Hashing(e)),
    }
}
