use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use keygate_auth::{RepositoryError, RepositoryResult, User, UserRepository};
use keygate_core::{Entity, UserId};

/// In-memory user store for tests/dev.
///
/// Emails are compared case-insensitively and are unique across all stored
/// records.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-built records, e.g. for a development directory.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let map = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            inner: RwLock::new(map),
        }
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, HashMap<UserId, User>>> {
        self.inner
            .read()
            .map_err(|_| RepositoryError::Backend("user store lock poisoned".into()))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, HashMap<UserId, User>>> {
        self.inner
            .write()
            .map_err(|_| RepositoryError::Backend("user store lock poisoned".into()))
    }
}

fn email_taken(map: &HashMap<UserId, User>, candidate: &User) -> bool {
    map.values().any(|existing| {
        !existing.same_identity_as(candidate)
            && existing.email.eq_ignore_ascii_case(&candidate.email)
    })
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_id(&self, id: &UserId) -> RepositoryResult<Option<User>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .read()?
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn create(&self, user: User) -> RepositoryResult<User> {
        let mut map = self.write()?;
        if map.contains_key(&user.id) {
            return Err(RepositoryError::Conflict(format!("user {} already exists", user.id)));
        }
        if email_taken(&map, &user) {
            return Err(RepositoryError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        map.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update(&self, mut user: User) -> RepositoryResult<User> {
        let mut map = self.write()?;
        if !map.contains_key(&user.id) {
            return Err(RepositoryError::NotFound(format!("user {}", user.id)));
        }
        if email_taken(&map, &user) {
            return Err(RepositoryError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        user.updated_at = Some(Utc::now());
        map.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn delete(&self, id: &UserId) -> RepositoryResult<bool> {
        Ok(self.write()?.remove(id).is_some())
    }
}
