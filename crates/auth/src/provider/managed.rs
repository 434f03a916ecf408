//! Managed-identity provider.
//!
//! Credentials are checked by an external identity service; after that the
//! provider mints and verifies its own tokens. The external service's tokens
//! are used once to read the user's attributes and never leave this module.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use keygate_core::UserId;

use crate::{AuthMode, ManagedIdentitySettings, Role, TokenCodec, User, UserRepository};

/// Attributes the identity service reports for an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAttributes {
    pub sub: String,
    pub email: String,
    pub username: String,
    pub roles: BTreeSet<Role>,
}

impl IdentityAttributes {
    fn into_user(self) -> User {
        let mut user = User::new(UserId::new(self.sub), self.email, self.username, String::new());
        user.roles = self.roles;
        user
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The service answered and said no.
    #[error("credentials rejected: {0}")]
    Rejected(String),

    /// Network failure, timeout, or 5xx.
    #[error("identity service unreachable: {0}")]
    Transport(String),

    /// The service answered with something we could not interpret.
    #[error("unexpected identity service response: {0}")]
    Protocol(String),
}

/// External identity service (e.g. a Cognito user pool).
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Password sign-in; returns the service's own access token.
    async fn initiate_auth(&self, username: &str, password: &str) -> Result<String, IdentityError>;

    /// Resolve an access token from [`IdentityService::initiate_auth`].
    async fn get_user(&self, access_token: &str) -> Result<IdentityAttributes, IdentityError>;
}

pub struct ManagedIdentityProvider {
    tier: AuthMode,
    identity: Arc<dyn IdentityService>,
    codec: TokenCodec,
    directory: Option<Arc<dyn UserRepository>>,
}

impl ManagedIdentityProvider {
    pub fn new(settings: &ManagedIdentitySettings, identity: Arc<dyn IdentityService>) -> Self {
        info!(
            tier = %settings.tier,
            region = %settings.region,
            user_pool_id = %settings.user_pool_id,
            "managed identity auth provider ready"
        );
        Self {
            tier: settings.tier,
            identity,
            codec: TokenCodec::new(settings.secret_key.as_bytes(), settings.token_ttl),
            directory: None,
        }
    }

    /// Resolve authenticated identities against stored user records.
    ///
    /// With a directory attached, a stored record matching the identity's
    /// email supplies roles and the active flag; inactive records cannot sign
    /// in.
    pub fn with_directory(mut self, directory: Arc<dyn UserRepository>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn tier(&self) -> AuthMode {
        self.tier
    }

    /// `None` on rejection, transport failure, or an inactive account.
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let attributes = match self.exchange(username, password).await {
            Ok(attributes) => attributes,
            Err(IdentityError::Rejected(reason)) => {
                debug!(tier = %self.tier, %reason, "identity service rejected credentials");
                return None;
            }
            Err(err) => {
                warn!(tier = %self.tier, error = %err, "identity service call failed");
                return None;
            }
        };

        let mut user = self.resolve(attributes.into_user()).await?;
        user.record_login(Utc::now());
        Some(user)
    }

    async fn exchange(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IdentityAttributes, IdentityError> {
        let access_token = self.identity.initiate_auth(username, password).await?;
        self.identity.get_user(&access_token).await
    }

    async fn resolve(&self, external: User) -> Option<User> {
        let Some(directory) = &self.directory else {
            return Some(external);
        };

        match directory.get_by_email(&external.email).await {
            Ok(Some(stored)) if !stored.is_active => {
                debug!(user_id = %stored.id, "inactive account refused");
                None
            }
            Ok(Some(mut stored)) => {
                stored.password_hash.clear();
                Some(stored)
            }
            Ok(None) => Some(external),
            Err(err) => {
                warn!(error = %err, "user directory lookup failed during sign-in");
                None
            }
        }
    }
}

impl core::fmt::Debug for ManagedIdentityProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManagedIdentityProvider")
            .field("tier", &self.tier)
            .field("codec", &self.codec)
            .field("directory", &self.directory.is_some())
            .finish_non_exhaustive()
    }
}
