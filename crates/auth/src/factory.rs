//! Provider factory.
//!
//! Runs once at startup. A returned provider is fully configured; a
//! configuration problem is returned as [`ConfigError`] and must stop the
//! process before it serves traffic.

use std::sync::Arc;

use tracing::info;

use crate::{
    AuthConfig, AuthProvider, ConfigError, IdentityService, LocalProvider, ManagedIdentityProvider,
    ManagedIdentitySettings, ProviderSettings, UserRepository,
};

/// Build the single provider for this process.
///
/// `connect` constructs the identity service client for managed-identity
/// modes; it is never called in local mode. `directory`, when given, is
/// attached to the managed-identity provider for record resolution.
pub fn create_provider<F>(
    config: &AuthConfig,
    connect: F,
    directory: Option<Arc<dyn UserRepository>>,
) -> Result<AuthProvider, ConfigError>
where
    F: FnOnce(&ManagedIdentitySettings) -> Result<Arc<dyn IdentityService>, ConfigError>,
{
    let provider: AuthProvider = match config.validate()? {
        ProviderSettings::Local(settings) => LocalProvider::from_settings(settings).into(),
        ProviderSettings::ManagedIdentity(settings) => {
            let identity = connect(&settings)?;
            let provider = ManagedIdentityProvider::new(&settings, identity);
            match directory {
                Some(directory) => provider.with_directory(directory),
                None => provider,
            }
            .into()
        }
    };

    info!(provider = provider.kind(), "auth provider selected");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::{AuthMode, IdentityAttributes, IdentityError};

    struct Unreachable;

    #[async_trait]
    impl IdentityService for Unreachable {
        async fn initiate_auth(&self, _u: &str, _p: &str) -> Result<String, IdentityError> {
            Err(IdentityError::Transport("connection refused".into()))
        }

        async fn get_user(&self, _t: &str) -> Result<IdentityAttributes, IdentityError> {
            Err(IdentityError::Transport("connection refused".into()))
        }
    }

    fn config(pairs: &[(&str, &str)]) -> AuthConfig {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AuthConfig::from_lookup(|k| map.get(k).map(|v| v.to_string())).unwrap()
    }

    fn connect_unreachable(
        _: &ManagedIdentitySettings,
    ) -> Result<Arc<dyn IdentityService>, ConfigError> {
        Ok(Arc::new(Unreachable))
    }

    #[test]
    fn local_mode_builds_local_provider_without_connecting() {
        let provider = create_provider(
            &config(&[("AUTH_TYPE", "local"), ("LOCAL_SECRET_KEY", "s3cr3t")]),
            |_| panic!("local mode must not build an identity client"),
            None,
        )
        .unwrap();
        assert!(matches!(provider, AuthProvider::Local(_)));
    }

    #[test]
    fn tier_modes_build_managed_identity_provider() {
        for tier in ["dev", "trial", "prod"] {
            let prefix = format!("{}_", tier.to_uppercase());
            let keys = [
                format!("{prefix}AWS_COGNITO_USER_POOL_ID"),
                format!("{prefix}AWS_COGNITO_CLIENT_ID"),
                format!("{prefix}AWS_REGION"),
                format!("{prefix}AWS_COGNITO_SECRET_KEY"),
            ];
            let mut pairs = vec![("AUTH_TYPE", tier)];
            pairs.extend(keys.iter().map(|k| (k.as_str(), "value")));

            let provider = create_provider(&config(&pairs), connect_unreachable, None).unwrap();
            let AuthProvider::ManagedIdentity(managed) = provider else {
                panic!("expected managed identity provider for {tier}");
            };
            assert_eq!(managed.tier().as_str(), tier);
        }
    }

    #[test]
    fn missing_values_fail_before_connecting() {
        let err = create_provider(
            &config(&[("AUTH_TYPE", "dev"), ("DEV_AWS_REGION", "us-east-1")]),
            |_| panic!("must not connect with incomplete configuration"),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingValue {
                mode: AuthMode::Dev,
                ..
            }
        ));
    }

    #[test]
    fn client_construction_errors_are_configuration_errors() {
        let pairs = [
            ("AUTH_TYPE", "prod"),
            ("PROD_AWS_COGNITO_USER_POOL_ID", "pool"),
            ("PROD_AWS_COGNITO_CLIENT_ID", "client"),
            ("PROD_AWS_REGION", "eu-west-1"),
            ("PROD_AWS_COGNITO_SECRET_KEY", "secret"),
        ];
        let err = create_provider(
            &config(&pairs),
            |_| Err(ConfigError::Client("tls backend unavailable".into())),
            None,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::Client("tls backend unavailable".into()));
    }

    #[tokio::test]
    async fn managed_provider_from_factory_degrades_to_none_when_unreachable() {
        let pairs = [
            ("AUTH_TYPE", "dev"),
            ("DEV_AWS_COGNITO_USER_POOL_ID", "pool"),
            ("DEV_AWS_COGNITO_CLIENT_ID", "client"),
            ("DEV_AWS_REGION", "us-east-1"),
            ("DEV_AWS_COGNITO_SECRET_KEY", "secret"),
        ];
        let provider = create_provider(&config(&pairs), connect_unreachable, None).unwrap();
        assert!(provider.authenticate("alice", "pw").await.is_none());
    }
}
