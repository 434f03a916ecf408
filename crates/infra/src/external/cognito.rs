//! Cognito user-pool client over the JSON 1.1 RPC endpoint.
//!
//! Only the two calls the managed provider needs are implemented:
//! `InitiateAuth` with `USER_PASSWORD_AUTH` and `GetUser`.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use keygate_auth::{
    ConfigError, IdentityAttributes, IdentityError, IdentityService, ManagedIdentitySettings, Role,
    parse_role_list,
};

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const ROLES_ATTRIBUTE: &str = "custom:roles";

pub struct CognitoIdentityClient {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
}

impl CognitoIdentityClient {
    pub fn new(settings: &ManagedIdentitySettings, timeout: Duration) -> Result<Self, ConfigError> {
        let endpoint = format!("https://cognito-idp.{}.amazonaws.com/", settings.region);
        Self::with_endpoint(endpoint, settings.client_id.clone(), timeout)
    }

    /// Point the client at an arbitrary endpoint (local emulators, tests).
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            client_id: client_id.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(
        &self,
        action: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, IdentityError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{action}"))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !status.is_success() {
            debug!(action, status = status.as_u16(), "identity service returned an error");
            return Err(classify_failure(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| IdentityError::Protocol(e.to_string()))
    }
}

impl core::fmt::Debug for CognitoIdentityClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CognitoIdentityClient")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[async_trait]
impl IdentityService for CognitoIdentityClient {
    async fn initiate_auth(&self, username: &str, password: &str) -> Result<String, IdentityError> {
        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": {
                "USERNAME": username,
                "PASSWORD": password,
            },
        });
        let value = self.call("InitiateAuth", body).await?;
        parse_initiate_auth(value)
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityAttributes, IdentityError> {
        let value = self
            .call("GetUser", json!({ "AccessToken": access_token }))
            .await?;
        parse_get_user(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    challenge_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserResponse {
    username: String,
    #[serde(default)]
    user_attributes: Vec<AttributeType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: String,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

/// Map a non-2xx answer onto the identity error kinds.
///
/// 4xx responses carrying a service error type are rejections; 5xx is a
/// transport problem; anything else is a protocol error.
fn classify_failure(status: u16, body: &str) -> IdentityError {
    if status >= 500 {
        return IdentityError::Transport(format!("status {status}"));
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) if (400..500).contains(&status) => {
            let kind = err.kind.rsplit('#').next().unwrap_or(&err.kind).to_string();
            match err.message {
                Some(msg) => IdentityError::Rejected(format!("{kind}: {msg}")),
                None => IdentityError::Rejected(kind),
            }
        }
        _ => IdentityError::Protocol(format!("status {status}")),
    }
}

fn parse_initiate_auth(value: serde_json::Value) -> Result<String, IdentityError> {
    let resp: InitiateAuthResponse =
        serde_json::from_value(value).map_err(|e| IdentityError::Protocol(e.to_string()))?;
    if let Some(challenge) = resp.challenge_name {
        // NEW_PASSWORD_REQUIRED, MFA and friends are not supported.
        return Err(IdentityError::Rejected(format!("challenge {challenge} required")));
    }
    resp.authentication_result
        .map(|r| r.access_token)
        .ok_or_else(|| IdentityError::Protocol("missing AuthenticationResult".into()))
}

fn parse_get_user(value: serde_json::Value) -> Result<IdentityAttributes, IdentityError> {
    let resp: GetUserResponse =
        serde_json::from_value(value).map_err(|e| IdentityError::Protocol(e.to_string()))?;

    let mut sub = None;
    let mut email = None;
    let mut roles: BTreeSet<Role> = BTreeSet::new();
    for attr in resp.user_attributes {
        match attr.name.as_str() {
            "sub" => sub = Some(attr.value),
            "email" => email = Some(attr.value),
            ROLES_ATTRIBUTE => roles = parse_role_list(&attr.value),
            _ => {}
        }
    }

    Ok(IdentityAttributes {
        sub: sub.ok_or_else(|| IdentityError::Protocol("missing sub attribute".into()))?,
        email: email.ok_or_else(|| IdentityError::Protocol("missing email attribute".into()))?,
        username: resp.username,
        roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_sign_in_yields_access_token() {
        let token = parse_initiate_auth(json!({
            "AuthenticationResult": {
                "AccessToken": "at-123",
                "ExpiresIn": 3600,
                "TokenType": "Bearer"
            }
        }))
        .unwrap();
        assert_eq!(token, "at-123");
    }

    #[test]
    fn challenge_is_a_rejection() {
        let err = parse_initiate_auth(json!({
            "ChallengeName": "NEW_PASSWORD_REQUIRED",
            "Session": "abc"
        }))
        .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }

    #[test]
    fn empty_sign_in_answer_is_protocol_error() {
        assert!(matches!(
            parse_initiate_auth(json!({})),
            Err(IdentityError::Protocol(_))
        ));
    }

    #[test]
    fn user_attributes_are_mapped() {
        let attrs = parse_get_user(json!({
            "Username": "alice",
            "UserAttributes": [
                { "Name": "sub", "Value": "0f1e-42" },
                { "Name": "email", "Value": "alice@example.com" },
                { "Name": "email_verified", "Value": "true" },
                { "Name": "custom:roles", "Value": "admin, viewer" }
            ]
        }))
        .unwrap();

        assert_eq!(attrs.sub, "0f1e-42");
        assert_eq!(attrs.email, "alice@example.com");
        assert_eq!(attrs.username, "alice");
        assert!(attrs.roles.contains(&Role::from("admin")));
        assert!(attrs.roles.contains(&Role::from("viewer")));
    }

    #[test]
    fn user_without_sub_is_protocol_error() {
        let err = parse_get_user(json!({
            "Username": "alice",
            "UserAttributes": [{ "Name": "email", "Value": "alice@example.com" }]
        }))
        .unwrap_err();
        assert!(matches!(err, IdentityError::Protocol(_)));
    }

    #[test]
    fn failure_classification() {
        let body = r#"{"__type":"NotAuthorizedException","message":"Incorrect username or password."}"#;
        assert!(matches!(classify_failure(400, body), IdentityError::Rejected(_)));

        let body = r#"{"__type":"com.amazonaws#UserNotFoundException"}"#;
        assert_eq!(
            classify_failure(400, body),
            IdentityError::Rejected("UserNotFoundException".into())
        );

        assert!(matches!(classify_failure(503, ""), IdentityError::Transport(_)));
        assert!(matches!(classify_failure(400, "<html>"), IdentityError::Protocol(_)));
    }

    #[test]
    fn regional_endpoint_is_derived_from_settings() {
        let settings = ManagedIdentitySettings {
            tier: keygate_auth::AuthMode::Dev,
            user_pool_id: "eu-west-1_abc".into(),
            client_id: "client".into(),
            region: "eu-west-1".into(),
            secret_key: "secret".into(),
            token_ttl: chrono::Duration::minutes(30),
        };
        let client = CognitoIdentityClient::new(&settings, Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "https://cognito-idp.eu-west-1.amazonaws.com/");
    }

    #[tokio::test]
    async fn silent_endpoint_times_out_as_transport_error() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = CognitoIdentityClient::with_endpoint(
            format!("http://{addr}/"),
            "client",
            Duration::from_millis(100),
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = client.initiate_auth("alice", "pw").await.unwrap_err();
        assert!(matches!(err, IdentityError::Transport(_)), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));

        server.abort();
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let client = CognitoIdentityClient::with_endpoint(
            "http://127.0.0.1:1/",
            "client",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.initiate_auth("alice", "pw").await.unwrap_err();
        assert!(matches!(err, IdentityError::Transport(_)));
    }
}
