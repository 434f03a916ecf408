//! Local provider: fixed credential registry, no network.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use keygate_core::UserId;

use crate::{LocalSettings, Role, TokenCodec, User};

/// Compared against when the login is unknown, so both failure paths do the
/// same amount of work.
const DUMMY_PASSWORD: &str = "keygate-dummy-password-for-unknown-logins";

/// One entry of the local registry.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LocalCredential {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl LocalCredential {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
            username: username.into(),
            password: password.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// The account seeded when no registry is configured.
    pub fn development() -> Self {
        Self::new("mock-user-1", "test@example.com", "testuser", "password123")
            .with_roles(["admin"])
    }

    fn matches_login(&self, login: &str) -> bool {
        self.email == login || self.username == login
    }

    fn to_user(&self, now: DateTime<Utc>) -> User {
        let mut user = User::new(self.id.clone(), &self.email, &self.username, String::new());
        user.roles = self.roles.clone();
        user.record_login(now);
        user
    }
}

impl core::fmt::Debug for LocalCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalCredential")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct LocalProvider {
    codec: TokenCodec,
    credentials: Vec<LocalCredential>,
}

impl LocalProvider {
    /// Provider with the default token lifetime.
    pub fn new(secret: &[u8], credentials: Vec<LocalCredential>) -> Self {
        Self {
            codec: TokenCodec::with_default_ttl(secret),
            credentials,
        }
    }

    pub fn from_settings(settings: LocalSettings) -> Self {
        info!(accounts = settings.credentials.len(), "local auth provider ready");
        Self {
            codec: TokenCodec::new(settings.secret_key.as_bytes(), settings.token_ttl),
            credentials: settings.credentials,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Exact, constant-time comparison against the registry.
    ///
    /// The login may be an email or a username. Unknown logins and wrong
    /// passwords both return `None` after the same comparison work.
    pub fn authenticate(&self, login: &str, password: &str) -> Option<User> {
        let candidate = self.credentials.iter().find(|c| c.matches_login(login));
        let expected = candidate.map_or(DUMMY_PASSWORD, |c| c.password.as_str());
        let password_ok = constant_time_eq(expected.as_bytes(), password.as_bytes());

        match candidate {
            Some(credential) if password_ok => Some(credential.to_user(Utc::now())),
            _ => {
                debug!("local authentication failed");
                None
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}
