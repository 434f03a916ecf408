use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use keygate_auth::{AuthConfig, IdentityService, UserRepository, create_provider};
use keygate_infra::{CognitoIdentityClient, InMemoryUserRepository};

const BIND_ADDR_VAR: &str = "BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const IDENTITY_TIMEOUT_VAR: &str = "IDENTITY_TIMEOUT_SECS";
const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    keygate_observability::init();

    let config = AuthConfig::from_env().context("invalid auth configuration")?;
    let identity_timeout = identity_timeout()?;

    let repo: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let provider = create_provider(
        &config,
        |settings| {
            let client = CognitoIdentityClient::new(settings, identity_timeout)?;
            Ok(Arc::new(client) as Arc<dyn IdentityService>)
        },
        Some(repo.clone()),
    )
    .context("failed to create auth provider")?;

    let app = keygate_api::build_app(Arc::new(provider), repo);

    let bind_addr =
        std::env::var(BIND_ADDR_VAR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

fn identity_timeout() -> anyhow::Result<Duration> {
    match std::env::var(IDENTITY_TIMEOUT_VAR) {
        Ok(raw) => {
            let secs: u64 = raw.trim().parse().with_context(|| {
                format!("{IDENTITY_TIMEOUT_VAR} must be a whole number of seconds")
            })?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(DEFAULT_IDENTITY_TIMEOUT_SECS)),
    }
}
