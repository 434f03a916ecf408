//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: user-management use cases and shared handles
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use keygate_auth::{AuthProvider, UserRepository};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(provider: Arc<AuthProvider>, repo: Arc<dyn UserRepository>) -> Router {
    let services = Arc::new(services::AppServices::new(provider.clone(), repo));
    let auth_state = middleware::AuthState::authenticated(provider.clone());

    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let root = Router::new()
        .route("/", get(routes::system::root))
        .layer(axum::middleware::from_fn_with_state(
            provider,
            middleware::optional_auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(root)
        .nest("/api/v1", routes::public_router().merge(protected))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(Extension(services)),
        )
}
