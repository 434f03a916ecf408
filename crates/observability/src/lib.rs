//! Process-wide tracing setup shared by the gateway binaries.

pub mod tracing;

pub use tracing::{LogFormat, init, init_with};
