use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    handler::Handler,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
};

use keygate_auth::{Role, requires};
use keygate_core::UserId;

use crate::app::{dto, errors, services::AppServices};
use crate::middleware::require_roles;

/// Reads are open to any verified caller; writes carry role guards.
pub fn router() -> Router {
    let admin = from_fn_with_state(requires(["admin"]), require_roles);
    let admin_or_manager = from_fn_with_state(requires(["admin", "manager"]), require_roles);

    Router::new()
        .route(
            "/",
            get(list_users).post(create_user.layer(admin.clone())),
        )
        .route(
            "/:id",
            get(get_user)
                .put(update_user.layer(admin_or_manager))
                .delete(delete_user.layer(admin)),
        )
}

fn parse_id(raw: String) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// GET /api/v1/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.users.list_users().await {
        Ok(users) => {
            let items = users.iter().map(dto::UserResponse::from).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /api/v1/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.users.get_user(&id).await {
        Ok(user) => (StatusCode::OK, Json(dto::UserResponse::from(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /api/v1/users - admin only.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    let roles: BTreeSet<Role> = body.roles.into_iter().map(Role::from).collect();
    match services
        .users
        .create_user(&body.email, &body.username, roles)
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(dto::UserResponse::from(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /api/v1/users/:id - admin or manager.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.users.update_user(&id, body.into()).await {
        Ok(user) => (StatusCode::OK, Json(dto::UserResponse::from(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /api/v1/users/:id - admin only.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.users.delete_user(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::MessageResponse {
                message: "User deleted successfully".into(),
            }),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
