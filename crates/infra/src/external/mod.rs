//! Clients for external services.

pub mod cognito;
