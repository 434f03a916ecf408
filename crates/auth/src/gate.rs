//! Request-scoped RBAC gate.
//!
//! Each request walks `Unauthenticated -> Token-Verified -> Role-Authorized`
//! or ends `Rejected`. Nothing is persisted between requests; the verifier is
//! a shared, read-only handle.

use thiserror::Error;
use tracing::debug;

use crate::{AuthzError, Principal, Requirement, TokenVerifier, authorize};

/// Rejection signal crossing the gate boundary.
///
/// Every authentication problem (missing, malformed, forged or expired
/// token) collapses into one kind so callers learn nothing about which check
/// failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication required")]
    AuthenticationFailure,

    #[error(transparent)]
    AuthorizationFailure(#[from] AuthzError),
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; an empty token is treated as no
/// token at all.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Unauthenticated -> Token-Verified.
pub fn verify_principal<V>(verifier: &V, token: Option<&str>) -> Result<Principal, AuthError>
where
    V: TokenVerifier + ?Sized,
{
    let token = token.ok_or(AuthError::AuthenticationFailure)?;
    verifier
        .verify_token(token)
        .map(Principal::from_claims)
        .ok_or(AuthError::AuthenticationFailure)
}

/// Full mandatory path: verify, then apply the operation's requirement.
pub fn enforce<V>(
    verifier: &V,
    token: Option<&str>,
    requirement: &Requirement,
) -> Result<Principal, AuthError>
where
    V: TokenVerifier + ?Sized,
{
    let principal = verify_principal(verifier, token)?;
    if let Err(err) = authorize(&principal, requirement) {
        debug!(user_id = %principal.id(), error = %err, "authorization denied");
        return Err(err.into());
    }
    Ok(principal)
}

/// Optional-auth path.
///
/// Missing and invalid tokens both resolve to anonymous (`None`); this path
/// never rejects. Routes that must not serve anonymous callers use
/// [`enforce`] instead.
pub fn optional_principal<V>(verifier: &V, token: Option<&str>) -> Option<Principal>
where
    V: TokenVerifier + ?Sized,
{
    verify_principal(verifier, token).ok()
}
