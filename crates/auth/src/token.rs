//! HS256 bearer token codec.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::{Claims, TokenValidationError, User, validate_claims};

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Longest configurable token lifetime (one day).
pub const MAX_TOKEN_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Encode(String),

    /// Malformed token, wrong algorithm, bad signature or missing claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Window(#[from] TokenValidationError),
}

/// Signs and verifies tokens with one symmetric secret.
///
/// Issue and verify always use the same key and algorithm, so a codec only
/// accepts tokens it (or an identically configured codec) produced.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against an explicit clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn with_default_ttl(secret: &[u8]) -> Self {
        Self::new(secret, Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES))
    }

    /// Sign `{sub, email, username, roles, exp, iat}` for `user`.
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims::for_user(user, now, self.ttl)
            .ok_or_else(|| TokenError::Encode("token expiry out of range".into()))?;
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Check signature and structure, then the time window at `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &"HS256")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use keygate_core::UserId;
    use proptest::prelude::*;

    fn alice() -> User {
        User::new(UserId::new("u1"), "a@b.com", "alice", "hash").with_roles(["admin"])
    }

    #[test]
    fn unrepresentable_expiry_is_an_error_not_a_panic() {
        let codec = TokenCodec::new(b"s3cr3t", Duration::days(400_000_000));
        assert!(matches!(
            codec.issue(&alice(), Utc::now()),
            Err(TokenError::Encode(_))
        ));
    }

    #[test]
    fn issued_token_verifies_within_window() {
        let codec = TokenCodec::with_default_ttl(b"s3cr3t");
        let now = Utc::now();
        let token = codec.issue(&alice(), now).unwrap();

        let claims = codec.verify(&token, now + Duration::minutes(29)).unwrap();
        assert_eq!(claims.sub.as_str(), "u1");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
        assert!(claims.roles.contains(&Role::new("admin")));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::with_default_ttl(b"s3cr3t");
        let now = Utc::now();
        let token = codec.issue(&alice(), now).unwrap();

        let err = codec.verify(&token, now + Duration::minutes(31)).unwrap_err();
        assert_eq!(err, TokenError::Window(TokenValidationError::Expired));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let now = Utc::now();
        let token = TokenCodec::with_default_ttl(b"other").issue(&alice(), now).unwrap();
        let err = TokenCodec::with_default_ttl(b"s3cr3t")
            .verify(&token, now)
            .unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let codec = TokenCodec::with_default_ttl(b"s3cr3t");
        assert!(matches!(
            codec.verify("garbage", Utc::now()),
            Err(TokenError::Invalid(_))
        ));
        assert!(codec.verify("", Utc::now()).is_err());
    }

    #[test]
    fn debug_output_hides_key_material() {
        let codec = TokenCodec::with_default_ttl(b"s3cr3t");
        assert!(!format!("{codec:?}").contains("s3cr3t"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: any user survives issue -> verify with identity and
        /// roles intact while the token is fresh.
        #[test]
        fn round_trip_preserves_identity(
            id in "[a-z0-9-]{1,24}",
            local in "[a-z]{1,10}",
            username in "[a-zA-Z0-9_]{3,16}",
            roles in prop::collection::btree_set("[a-z]{1,8}", 0..4),
            elapsed_secs in 0i64..(30 * 60),
        ) {
            let codec = TokenCodec::with_default_ttl(b"prop-secret");
            let now = Utc::now();
            let user = User::new(UserId::new(id), format!("{local}@example.com"), username, "")
                .with_roles(roles.into_iter().map(Role::from));

            let token = codec.issue(&user, now).unwrap();
            let claims = codec.verify(&token, now + Duration::seconds(elapsed_secs)).unwrap();

            prop_assert_eq!(&claims.sub, &user.id);
            prop_assert_eq!(&claims.email, &user.email);
            prop_assert_eq!(&claims.username, &user.username);
            prop_assert_eq!(&claims.roles, &user.roles);
        }
    }
}
