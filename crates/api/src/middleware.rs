use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};

use keygate_auth::{
    AuthError, AuthProvider, Requirement, RoleGuard, bearer_token, enforce, optional_principal,
};

use crate::app::errors;
use crate::context::{OptionalPrincipal, PrincipalContext, RequestId};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const UNLOGGED_PATHS: &[&str] = &["/health", "/metrics"];

#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<AuthProvider>,
    pub requirement: Requirement,
}

impl AuthState {
    /// Any verified principal passes.
    pub fn authenticated(provider: Arc<AuthProvider>) -> Self {
        Self {
            provider,
            requirement: Requirement::Authenticated,
        }
    }
}

/// Mandatory auth: 401 (with challenge) or 403, otherwise a
/// [`PrincipalContext`] extension for the handler.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = extract_bearer(req.headers());

    match enforce(state.provider.as_ref(), token, &state.requirement) {
        Ok(principal) => {
            req.extensions_mut().insert(PrincipalContext::new(principal));
            next.run(req).await
        }
        Err(err) => errors::auth_error_to_response(err),
    }
}

/// Per-route role gate, layered on handlers behind [`auth_middleware`].
pub async fn require_roles(
    State(guard): State<RoleGuard>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<PrincipalContext>() else {
        return errors::auth_error_to_response(AuthError::AuthenticationFailure);
    };
    if let Err(err) = guard.check(ctx.principal()) {
        return errors::authz_error_to_response(err);
    }
    next.run(req).await
}

/// Optional auth: never rejects; handlers see an [`OptionalPrincipal`].
pub async fn optional_auth_middleware(
    State(provider): State<Arc<AuthProvider>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let principal = optional_principal(provider.as_ref(), extract_bearer(req.headers()));
    req.extensions_mut().insert(OptionalPrincipal(principal));
    next.run(req).await
}

/// Structured request/response logging with a per-request id.
///
/// Health checks and `OPTIONS` preflights pass through unlogged.
pub async fn request_logging(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let request_id = RequestId::new();
    req.extensions_mut().insert(request_id);

    let path = req.uri().path().to_string();
    let method = req.method().clone();
    if method == Method::OPTIONS || UNLOGGED_PATHS.iter().any(|p| path.starts_with(p)) {
        return next.run(req).await;
    }

    // Query strings are left out; they may carry credentials.
    info!(%request_id, %method, %path, "request received");

    let started = Instant::now();
    let mut resp = next.run(req).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = resp.status().as_u16();

    if resp.status().is_server_error() {
        error!(%request_id, %method, %path, status, latency_ms, "response sent");
    } else if resp.status().is_client_error() {
        warn!(%request_id, %method, %path, status, latency_ms, "response sent");
    } else {
        info!(%request_id, %method, %path, status, latency_ms, "response sent");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(bearer_token)
}
