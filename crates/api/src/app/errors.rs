use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use keygate_auth::{AuthError, AuthzError, RepositoryError};
use keygate_core::DomainError;

use crate::app::services::ServiceError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 401 with the bearer challenge header.
pub fn unauthorized(message: impl Into<String>) -> axum::response::Response {
    let mut resp = json_error(StatusCode::UNAUTHORIZED, "unauthorized", message);
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    resp
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::AuthenticationFailure => unauthorized("Invalid authentication credentials"),
        AuthError::AuthorizationFailure(e) => authz_error_to_response(e),
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "User not found")
        }
        ServiceError::EmailTaken(_) => {
            json_error(StatusCode::CONFLICT, "conflict", "Email already registered")
        }
        ServiceError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
        }
        ServiceError::Repository(RepositoryError::Conflict(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        ServiceError::Repository(RepositoryError::NotFound(_)) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "User not found")
        }
        ServiceError::Repository(RepositoryError::Backend(msg)) => {
            tracing::error!(error = %msg, "user repository failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "user store unavailable",
            )
        }
    }
}
