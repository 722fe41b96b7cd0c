//! Credential store
//!
//! Persists user accounts (username, password hash, coin balance).
//! `PgUserStore` is the production backend over SQLx and PostgreSQL;
//! `InMemoryUserStore` backs tests and local runs without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{MerchError, Result, User, STARTING_COINS};

/// Trait for credential store operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Check whether a username is taken
    async fn exists(&self, username: &str) -> Result<bool>;

    /// Create an account with the starting balance and return its id
    ///
    /// Fails with `MerchError::AlreadyExists` when the username is taken.
    async fn create(&self, username: &str, password_hash: &str) -> Result<i64>;

    /// Get user by username, `MerchError::NotFound` if absent
    async fn find_by_username(&self, username: &str) -> Result<User>;

    /// Get user by id, `MerchError::NotFound` if absent
    async fn find_by_id(&self, id: i64) -> Result<User>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id          BIGSERIAL PRIMARY KEY,
        username    TEXT        NOT NULL UNIQUE,
        password    TEXT        NOT NULL,
        coins       BIGINT      NOT NULL DEFAULT 1000 CHECK (coins >= 0),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

/// PostgreSQL user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store with its own connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| MerchError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create the `users` table if it does not exist yet
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| MerchError::DatabaseError(format!("Failed to create users table: {e}")))?;

        Ok(())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    coins: i64,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password,
            coins: row.coins,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserStore {
    async fn exists(&self, username: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| MerchError::DatabaseError(format!("Failed to check user: {e}")))?;

        Ok(exists)
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO users (username, password, coins) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .bind(STARTING_COINS)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => MerchError::AlreadyExists(username.to_string()),
            _ => MerchError::DatabaseError(format!("Failed to create user: {e}")),
        })?;

        Ok(row.0)
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password, coins, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MerchError::DatabaseError(format!("Failed to get user: {e}")))?;

        row.map(User::from)
            .ok_or_else(|| MerchError::NotFound(username.to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password, coins, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MerchError::DatabaseError(format!("Failed to get user: {e}")))?;

        row.map(User::from)
            .ok_or_else(|| MerchError::NotFound(format!("id {id}")))
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    last_id: i64,
}

/// In-memory user store
///
/// Ids are assigned sequentially starting at 1, like a fresh `BIGSERIAL`.
#[derive(Default)]
pub struct InMemoryUserStore {
    state: RwLock<MemoryState>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.state.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    async fn exists(&self, username: &str) -> Result<bool> {
        Ok(self.state.read().await.users.contains_key(username))
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<i64> {
        let mut state = self.state.write().await;
        if state.users.contains_key(username) {
            return Err(MerchError::AlreadyExists(username.to_string()));
        }

        state.last_id += 1;
        let id = state.last_id;
        state.users.insert(
            username.to_string(),
            User {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                coins: STARTING_COINS,
                created_at: Utc::now(),
            },
        );

        tracing::debug!(user_id = id, username, "Created user in memory store");
        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        self.state
            .read()
            .await
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| MerchError::NotFound(username.to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<User> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| MerchError::NotFound(format!("id {id}")))
    }
}
