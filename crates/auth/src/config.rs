//! Provider configuration, read once at process start.
//!
//! Raw values are collected into [`AuthConfig`]; [`AuthConfig::validate`]
//! turns them into a closed [`ProviderSettings`] or fails with
//! [`ConfigError`]. Anything that could be wrong about the configuration is
//! reported here, before the first request is served.

use chrono::Duration;
use thiserror::Error;

use crate::{DEFAULT_TOKEN_TTL_MINUTES, LocalCredential, MAX_TOKEN_TTL_MINUTES};

pub const AUTH_TYPE_VAR: &str = "AUTH_TYPE";
pub const TOKEN_TTL_VAR: &str = "TOKEN_TTL_MINUTES";
pub const LOCAL_SECRET_VAR: &str = "LOCAL_SECRET_KEY";
pub const LOCAL_USERS_VAR: &str = "LOCAL_USERS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown auth type '{0}' (expected one of: local, dev, trial, prod)")]
    UnknownMode(String),

    #[error("{mode} auth requires {key} to be set")]
    MissingValue { mode: AuthMode, key: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to build identity service client: {0}")]
    Client(String),
}

/// Provider selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    Local,
    Dev,
    Trial,
    Prod,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Local => "local",
            AuthMode::Dev => "dev",
            AuthMode::Trial => "trial",
            AuthMode::Prod => "prod",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AuthMode::Local)
    }

    /// Prefix of the deployment tier's variables (`DEV_`, `PROD_`, ...).
    pub fn env_prefix(&self) -> String {
        match self {
            AuthMode::Local => String::new(),
            tier => format!("{}_", tier.as_str().to_uppercase()),
        }
    }
}

impl core::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AuthMode::Local),
            "dev" => Ok(AuthMode::Dev),
            "trial" => Ok(AuthMode::Trial),
            "prod" => Ok(AuthMode::Prod),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Raw provider configuration. Empty strings count as missing.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub mode: Option<AuthMode>,
    pub secret_key: Option<String>,
    pub user_pool_id: Option<String>,
    pub client_id: Option<String>,
    pub region: Option<String>,
    /// JSON array of [`LocalCredential`]s.
    pub local_users: Option<String>,
    pub token_ttl_minutes: Option<i64>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (environment, a map in tests, ...).
    ///
    /// `AUTH_TYPE` defaults to `local`. Local mode reads `LOCAL_SECRET_KEY`;
    /// tier `T` reads `T_AWS_COGNITO_USER_POOL_ID`, `T_AWS_COGNITO_CLIENT_ID`,
    /// `T_AWS_REGION` and `T_AWS_COGNITO_SECRET_KEY`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = match get(AUTH_TYPE_VAR) {
            Some(raw) => raw.parse()?,
            None => AuthMode::Local,
        };

        let token_ttl_minutes = get(TOKEN_TTL_VAR)
            .map(|raw| {
                let minutes = raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                    key: TOKEN_TTL_VAR.to_string(),
                    reason: format!("expected a whole number of minutes, got '{raw}'"),
                })?;
                token_ttl(minutes).map(|_| minutes)
            })
            .transpose()?;

        let mut config = AuthConfig {
            mode: Some(mode),
            token_ttl_minutes,
            ..AuthConfig::default()
        };

        if mode.is_local() {
            config.secret_key = get(LOCAL_SECRET_VAR);
            config.local_users = get(LOCAL_USERS_VAR);
        } else {
            let prefix = mode.env_prefix();
            config.user_pool_id = get(format!("{prefix}AWS_COGNITO_USER_POOL_ID").as_str());
            config.client_id = get(format!("{prefix}AWS_COGNITO_CLIENT_ID").as_str());
            config.region = get(format!("{prefix}AWS_REGION").as_str());
            config.secret_key = get(format!("{prefix}AWS_COGNITO_SECRET_KEY").as_str());
        }

        Ok(config)
    }

    /// Validate every value the selected mode needs.
    pub fn validate(&self) -> Result<ProviderSettings, ConfigError> {
        let mode = self.mode.unwrap_or(AuthMode::Local);
        let token_ttl = token_ttl(self.token_ttl_minutes.unwrap_or(DEFAULT_TOKEN_TTL_MINUTES))?;
        let prefix = mode.env_prefix();

        let require = |value: &Option<String>, key: &str| -> Result<String, ConfigError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MissingValue {
                    mode,
                    key: format!("{prefix}{key}"),
                })
        };

        if mode.is_local() {
            let secret_key = require(&self.secret_key, LOCAL_SECRET_VAR)?;
            let credentials = match self.local_users.as_deref() {
                Some(raw) => parse_local_users(raw)?,
                None => vec![LocalCredential::development()],
            };
            return Ok(ProviderSettings::Local(LocalSettings {
                secret_key,
                credentials,
                token_ttl,
            }));
        }

        Ok(ProviderSettings::ManagedIdentity(ManagedIdentitySettings {
            tier: mode,
            user_pool_id: require(&self.user_pool_id, "AWS_COGNITO_USER_POOL_ID")?,
            client_id: require(&self.client_id, "AWS_COGNITO_CLIENT_ID")?,
            region: require(&self.region, "AWS_REGION")?,
            secret_key: require(&self.secret_key, "AWS_COGNITO_SECRET_KEY")?,
            token_ttl,
        }))
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("user_pool_id", &self.user_pool_id)
            .field("client_id", &self.client_id)
            .field("region", &self.region)
            .field("local_users", &self.local_users.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

/// Token lifetime in `1..=MAX_TOKEN_TTL_MINUTES` minutes.
fn token_ttl(minutes: i64) -> Result<Duration, ConfigError> {
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        return Err(ConfigError::InvalidValue {
            key: TOKEN_TTL_VAR.to_string(),
            reason: format!("must be between 1 and {MAX_TOKEN_TTL_MINUTES} minutes, got {minutes}"),
        });
    }
    Duration::try_minutes(minutes).ok_or_else(|| ConfigError::InvalidValue {
        key: TOKEN_TTL_VAR.to_string(),
        reason: format!("{minutes} minutes is out of range"),
    })
}

fn parse_local_users(raw: &str) -> Result<Vec<LocalCredential>, ConfigError> {
    let credentials: Vec<LocalCredential> =
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidValue {
            key: LOCAL_USERS_VAR.to_string(),
            reason: e.to_string(),
        })?;

    if credentials.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: LOCAL_USERS_VAR.to_string(),
            reason: "registry is empty".to_string(),
        });
    }
    Ok(credentials)
}

/// Validated settings, one variant per provider.
#[derive(Clone)]
pub enum ProviderSettings {
    Local(LocalSettings),
    ManagedIdentity(ManagedIdentitySettings),
}

#[derive(Clone)]
pub struct LocalSettings {
    pub secret_key: String,
    pub credentials: Vec<LocalCredential>,
    pub token_ttl: Duration,
}

#[derive(Clone)]
pub struct ManagedIdentitySettings {
    pub tier: AuthMode,
    pub user_pool_id: String,
    pub client_id: String,
    pub region: String,
    pub secret_key: String,
    pub token_ttl: Duration,
}

impl core::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProviderSettings::Local(s) => f
                .debug_struct("Local")
                .field("accounts", &s.credentials.len())
                .field("token_ttl_minutes", &s.token_ttl.num_minutes())
                .finish_non_exhaustive(),
            ProviderSettings::ManagedIdentity(s) => f
                .debug_struct("ManagedIdentity")
                .field("tier", &s.tier)
                .field("user_pool_id", &s.user_pool_id)
                .field("client_id", &s.client_id)
                .field("region", &s.region)
                .field("token_ttl_minutes", &s.token_ttl.num_minutes())
                .finish_non_exhaustive(),
        }
    }
}
