//! Authentication providers.
//!
//! Exactly one [`AuthProvider`] variant is active per process. Call sites
//! only ever see the enum, so swapping the managed identity service for the
//! local registry changes configuration, not code.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{Claims, TokenCodec, TokenError, User};

pub mod local;
pub mod managed;

pub use local::{LocalCredential, LocalProvider};
pub use managed::{IdentityAttributes, IdentityError, IdentityService, ManagedIdentityProvider};

/// Anything that can turn a raw bearer token into verified claims.
///
/// The RBAC gate depends on this seam rather than on a concrete provider.
pub trait TokenVerifier: Send + Sync {
    fn verify_token(&self, token: &str) -> Option<Claims>;
}

/// The active authentication backend.
#[derive(Debug)]
pub enum AuthProvider {
    Local(LocalProvider),
    ManagedIdentity(ManagedIdentityProvider),
}

impl AuthProvider {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthProvider::Local(_) => "local",
            AuthProvider::ManagedIdentity(_) => "managed_identity",
        }
    }

    /// Check credentials. `None` on any failure, whatever the cause.
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        match self {
            AuthProvider::Local(p) => p.authenticate(username, password),
            AuthProvider::ManagedIdentity(p) => p.authenticate(username, password).await,
        }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, TokenError> {
        self.issue_token_at(user, Utc::now())
    }

    pub fn issue_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.codec().issue(user, now)
    }

    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Option<Claims> {
        match self.codec().verify(token, now) {
            Ok(claims) => Some(claims),
            Err(err) => {
                debug!(provider = self.kind(), error = %err, "token rejected");
                None
            }
        }
    }

    fn codec(&self) -> &TokenCodec {
        match self {
            AuthProvider::Local(p) => p.codec(),
            AuthProvider::ManagedIdentity(p) => p.codec(),
        }
    }
}

impl TokenVerifier for AuthProvider {
    fn verify_token(&self, token: &str) -> Option<Claims> {
        self.verify_token_at(token, Utc::now())
    }
}

impl From<LocalProvider> for AuthProvider {
    fn from(value: LocalProvider) -> Self {
        Self::Local(value)
    }
}

impl From<ManagedIdentityProvider> for AuthProvider {
    fn from(value: ManagedIdentityProvider) -> Self {
        Self::ManagedIdentity(value)
    }
}
