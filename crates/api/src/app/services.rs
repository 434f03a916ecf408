//! Application services wired into the router.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use keygate_auth::{AuthProvider, RepositoryError, Role, User, UserRepository};
use keygate_core::{DomainError, UserId};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppServices {
    pub provider: Arc<AuthProvider>,
    pub users: UserService,
}

impl AppServices {
    pub fn new(provider: Arc<AuthProvider>, repo: Arc<dyn UserRepository>) -> Self {
        Self {
            provider,
            users: UserService::new(repo),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("user not found: {0}")]
    NotFound(UserId),

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub is_active: Option<bool>,
    pub roles: Option<BTreeSet<Role>>,
}

/// User-management use cases on top of the repository port.
///
/// Passwords never pass through here; credentials live with the identity
/// provider.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        roles: BTreeSet<Role>,
    ) -> ServiceResult<User> {
        let mut user = User::register(email, username, String::new())?;
        user.roles = roles;

        if self.repo.get_by_email(&user.email).await?.is_some() {
            return Err(ServiceError::EmailTaken(user.email));
        }

        let created = self.repo.create(user).await?;
        info!(user_id = %created.id, "user created");
        Ok(created)
    }

    pub async fn update_user_status(&self, id: &UserId, is_active: bool) -> ServiceResult<User> {
        let mut user = self.get_user(id).await?;
        if is_active {
            user.activate();
        } else {
            user.deactivate();
        }
        let updated = self.repo.update(user).await?;
        info!(user_id = %updated.id, is_active, "user status changed");
        Ok(updated)
    }

    pub async fn update_user(&self, id: &UserId, changes: UserChanges) -> ServiceResult<User> {
        let mut user = self.get_user(id).await?;

        if let Some(email) = changes.email.as_deref() {
            user.update_email(email)?;
        }
        if let Some(username) = changes.username.as_deref() {
            user.update_username(username)?;
        }
        match changes.is_active {
            Some(true) => user.activate(),
            Some(false) => user.deactivate(),
            None => {}
        }
        if let Some(roles) = changes.roles {
            let revoked: Vec<Role> = user.roles.difference(&roles).cloned().collect();
            for role in &revoked {
                user.remove_role(role);
            }
            for role in roles {
                user.add_role(role);
            }
        }

        Ok(self.repo.update(user).await?)
    }

    pub async fn get_user(&self, id: &UserId) -> ServiceResult<User> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        let mut users = self.repo.list_users().await?;
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(users)
    }

    pub async fn delete_user(&self, id: &UserId) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(id.clone()));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_infra::InMemoryUserRepository;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryUserRepository::new()))
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let svc = service();
        svc.create_user("bob@example.com", "bob", BTreeSet::new())
            .await
            .unwrap();

        let err = svc
            .create_user("BOB@example.com", "bobby", BTreeSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn create_user_validates_input() {
        let err = service()
            .create_user("bob@example.com", "b", BTreeSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn status_toggle_round_trips_through_store() {
        let svc = service();
        let bob = svc
            .create_user("bob@example.com", "bob", BTreeSet::new())
            .await
            .unwrap();

        let off = svc.update_user_status(&bob.id, false).await.unwrap();
        assert!(!off.is_active);
        assert!(!svc.get_user(&bob.id).await.unwrap().is_active);

        let on = svc.update_user_status(&bob.id, true).await.unwrap();
        assert!(on.is_active);
    }

    #[tokio::test]
    async fn status_of_unknown_user_is_not_found() {
        let err = service()
            .update_user_status(&UserId::new("nope"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn partial_update_touches_only_given_fields() {
        let svc = service();
        let bob = svc
            .create_user("bob@example.com", "bob", [Role::from("viewer")].into())
            .await
            .unwrap();

        let changes = UserChanges {
            username: Some("robert".into()),
            roles: Some([Role::from("manager")].into()),
            ..UserChanges::default()
        };
        let updated = svc.update_user(&bob.id, changes).await.unwrap();

        assert_eq!(updated.username, "robert");
        assert_eq!(updated.email, "bob@example.com");
        assert!(updated.is_active);
        assert!(updated.has_role("manager"));
        assert!(!updated.has_role("viewer"));
    }

    #[tokio::test]
    async fn delete_reports_missing_user() {
        let svc = service();
        let bob = svc
            .create_user("bob@example.com", "bob", BTreeSet::new())
            .await
            .unwrap();

        svc.delete_user(&bob.id).await.unwrap();
        assert!(matches!(
            svc.delete_user(&bob.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
