use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod system;
pub mod users;

/// Public `/api/v1` routes (no token required).
pub fn public_router() -> Router {
    Router::new().route("/login", post(auth::login))
}

/// Authenticated `/api/v1` routes; per-route role guards live in the handlers.
pub fn protected_router() -> Router {
    Router::new()
        .route("/me", get(auth::me))
        .nest("/users", users::router())
}
