use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

/// POST /api/v1/login - exchange credentials for a bearer token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let Some(user) = services
        .provider
        .authenticate(&body.username, &body.password)
        .await
    else {
        return errors::unauthorized("Incorrect username or password");
    };

    let token = match services.provider.issue_token(&user) {
        Ok(token) => token,
        Err(err) => {
            error!(error = %err, "failed to issue token");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "could not issue token",
            );
        }
    };

    info!(user_id = %user.id, provider = services.provider.kind(), "login succeeded");
    (
        StatusCode::OK,
        Json(dto::LoginResponse {
            token: dto::TokenResponse::bearer(token),
            user: dto::UserResponse::from(&user),
        }),
    )
        .into_response()
}

/// GET /api/v1/me - the principal as carried by the token.
pub async fn me(Extension(principal): Extension<PrincipalContext>) -> Json<dto::UserResponse> {
    Json(dto::UserResponse::from(principal.principal()))
}
