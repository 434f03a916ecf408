//! HTTP API: router, auth middleware, and request/response mapping.

pub mod app;
pub mod context;
pub mod middleware;

pub use app::build_app;
