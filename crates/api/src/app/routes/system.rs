use axum::{Extension, Json, http::StatusCode};

use crate::app::dto::MessageResponse;
use crate::context::OptionalPrincipal;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET / - optional auth; greets the caller by name when a valid token is sent.
pub async fn root(Extension(caller): Extension<OptionalPrincipal>) -> Json<MessageResponse> {
    let message = match caller.0 {
        Some(principal) => format!("Welcome to Admin API, {}", principal.username()),
        None => "Welcome to Admin API".to_string(),
    };
    Json(MessageResponse { message })
}
