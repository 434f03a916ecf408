use core::fmt;

use keygate_auth::Principal;
use uuid::Uuid;

/// Principal context for a request (verified identity + roles).
///
/// Present on every route behind the mandatory auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// Caller on optional-auth routes; `None` means anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionalPrincipal(pub Option<Principal>);

/// Correlation id assigned by the request-logging middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
