//! User entity for identity management.
//!
//! The record is immutable by convention: callers change it only through the
//! named mutations below, each of which stamps `updated_at`. Email uniqueness
//! is a repository concern and is not checked here.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keygate_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

/// Minimum username length accepted by [`User::register`] and
/// [`User::update_username`].
pub const MIN_USERNAME_LEN: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// User account record.
///
/// # Invariants
/// - `id` never changes once assigned.
/// - `username` is at least [`MIN_USERNAME_LEN`] characters when set through
///   the entity API.
/// - `password_hash` is empty for principals rebuilt from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Build a user from already-trusted parts (storage rows, identity
    /// providers). No validation is applied.
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            is_active: true,
            roles: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: None,
            last_login: None,
        }
    }

    /// Register a brand new account with a freshly generated id.
    pub fn register(
        email: &str,
        username: &str,
        password_hash: impl Into<String>,
    ) -> DomainResult<Self> {
        let email = normalize_email(email)?;
        validate_username(username)?;

        Ok(Self::new(
            UserId::generate(),
            email,
            username.trim(),
            password_hash,
        ))
    }

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn update_username(&mut self, new_username: &str) -> DomainResult<()> {
        validate_username(new_username)?;
        self.username = new_username.trim().to_string();
        self.touch();
        Ok(())
    }

    pub fn update_email(&mut self, new_email: &str) -> DomainResult<()> {
        self.email = normalize_email(new_email)?;
        self.touch();
        Ok(())
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    /// Grant a role. Returns `false` if the role was already present.
    pub fn add_role(&mut self, role: impl Into<Role>) -> bool {
        let inserted = self.roles.insert(role.into());
        self.touch();
        inserted
    }

    /// Revoke a role. Returns `false` if the role was not present.
    pub fn remove_role(&mut self, role: &Role) -> bool {
        let removed = self.roles.remove(role);
        self.touch();
        removed
    }

    /// Stamp a successful sign-in.
    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.last_login = Some(at);
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email.to_lowercase())
}

fn validate_username(username: &str) -> DomainResult<()> {
    if username.trim().chars().count() < MIN_USERNAME_LEN {
        return Err(DomainError::validation(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
