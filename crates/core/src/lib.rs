//! `keygate-core`: shared domain primitives for the gateway.
//!
//! No IO and no transport concerns live here.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::UserId;
