use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keygate_core::UserId;

use crate::{Role, User};

/// Bearer token claims.
///
/// `sub`, `email`, `username` and `exp` must be present in a token; `roles`
/// defaults to the empty set for tokens minted before roles were carried.
/// Timestamps are unix seconds, as in any JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject / user identifier.
    pub sub: UserId,

    pub email: String,

    pub username: String,

    /// RBAC roles granted to the subject.
    #[serde(default)]
    pub roles: BTreeSet<Role>,

    /// Expiration timestamp.
    pub exp: i64,

    /// Issued-at timestamp (informational, 0 when absent).
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    /// Claims for `user`, valid from `issued_at` for `ttl`.
    ///
    /// `None` when the expiry falls outside the representable date range.
    pub fn for_user(
        user: &User,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Option<Self> {
        let expires_at = issued_at.checked_add_signed(ttl)?;
        Some(Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            roles: user.roles.clone(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        })
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        if self.iat == 0 {
            return None;
        }
        DateTime::from_timestamp(self.iat, 0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens in [`crate::TokenCodec`]; this only checks
/// the claims against `now`, with no leeway.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.iat != 0 {
        if claims.exp <= claims.iat {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
        if now < claims.iat {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_at(now: DateTime<Utc>) -> Claims {
        let user = User::new(UserId::new("u1"), "a@b.com", "alice", "").with_roles(["admin"]);
        Claims::for_user(&user, now, Duration::minutes(30)).unwrap()
    }

    #[test]
    fn window_is_half_open() {
        let now = Utc::now();
        let claims = claims_at(now);
        assert_eq!(validate_claims(&claims, now), Ok(()));
        assert_eq!(
            validate_claims(&claims, now + Duration::minutes(29)),
            Ok(())
        );
        assert_eq!(
            validate_claims(&claims, now + Duration::minutes(30)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn future_issued_tokens_are_rejected() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::minutes(5));
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let mut claims = claims_at(now);
        claims.exp = claims.iat;
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn roles_default_to_empty_when_absent() {
        let json = r#"{"sub":"u1","email":"a@b.com","username":"alice","exp":4102444800}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert!(claims.roles.is_empty());
        assert_eq!(claims.iat, 0);
        assert!(claims.issued_at().is_none());
    }
}
