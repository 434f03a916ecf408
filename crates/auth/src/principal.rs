use std::collections::BTreeSet;

use chrono::Utc;

use keygate_core::UserId;

use crate::{Claims, Role, User};

/// The identity materialized from a verified token.
///
/// A principal is a [`User`] carrying only what the token carries: identity
/// fields and roles. It has an empty `password_hash` and is never looked up
/// in storage; handlers that need the full record go through the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user: User,
}

impl Principal {
    pub fn from_claims(claims: Claims) -> Self {
        let created_at = claims.issued_at().unwrap_or_else(Utc::now);
        let mut user = User::new(claims.sub, claims.email, claims.username, String::new());
        user.roles = claims.roles;
        user.created_at = created_at;
        Self { user }
    }

    pub fn id(&self) -> &UserId {
        &self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.user.roles
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn into_user(self) -> User {
        self.user
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self::from_claims(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_carries_token_fields_only() {
        let claims = Claims {
            sub: UserId::new("u1"),
            email: "a@b.com".into(),
            username: "alice".into(),
            roles: [Role::new("admin")].into_iter().collect(),
            exp: 4_102_444_800,
            iat: 1_700_000_000,
        };

        let principal = Principal::from_claims(claims);
        assert_eq!(principal.id().as_str(), "u1");
        assert_eq!(principal.username(), "alice");
        assert!(principal.user().password_hash.is_empty());
        assert!(principal.user().is_active);
        assert_eq!(principal.user().created_at.timestamp(), 1_700_000_000);
        assert!(principal.into_user().has_role("admin"));
    }
}
