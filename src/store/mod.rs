/// External collaborators of the authentication core
///
/// - `KvStore`: key-value store with store-managed expiry, holds refresh tokens
/// - `UserStore`: user accounts, point lookups by id or lowercased email
///
/// Both come with an in-memory implementation (tests, local development)
/// and a PostgreSQL implementation.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::auth::Role;

pub use memory::{InMemoryKvStore, InMemoryUserStore};
pub use postgres::{PgKvStore, PgUserStore};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("{0}")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict("An account with this email already exists".to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Key-value store with per-key expiry, atomic at the single-key level
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), StoreError>;

    /// Idempotent; deleting an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Drop every expired entry, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// A user-account row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// `email` must already be lowercased
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with `StoreError::Conflict` when the email is taken
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
}
