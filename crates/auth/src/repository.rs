//! User repository port.
//!
//! Storage adapters implement [`UserRepository`]; nothing in this crate
//! depends on a concrete backend.

use async_trait::async_trait;
use thiserror::Error;

use keygate_core::UserId;

use crate::User;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// `create` with an email that is already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// `update` of an id that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence contract for user records.
///
/// "Not found" is a value, not an error, for every read and for `delete`.
/// Callers must not assume any ordering from `list_users`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: &UserId) -> RepositoryResult<Option<User>>;

    /// Lookup used to enforce email uniqueness before creation.
    async fn get_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn list_users(&self) -> RepositoryResult<Vec<User>>;

    /// Persist a new record. Fails with [`RepositoryError::Conflict`] if the
    /// email already exists.
    async fn create(&self, user: User) -> RepositoryResult<User>;

    /// Replace the full record. Fails with [`RepositoryError::NotFound`] if
    /// the id does not exist.
    async fn update(&self, user: User) -> RepositoryResult<User>;

    /// Returns whether a record existed and was removed. Idempotent.
    async fn delete(&self, id: &UserId) -> RepositoryResult<bool>;
}
