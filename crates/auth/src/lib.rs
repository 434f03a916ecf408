//! `keygate-auth`: authentication providers, token lifecycle and RBAC gate.
//!
//! This crate is decoupled from HTTP and from any concrete storage: the HTTP
//! layer feeds it raw bearer tokens and credentials, storage adapters
//! implement [`UserRepository`].

pub mod authorize;
pub mod claims;
pub mod config;
pub mod factory;
pub mod gate;
pub mod principal;
pub mod provider;
pub mod repository;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{AuthzError, Requirement, RoleGuard, authorize, requires};
pub use claims::{Claims, TokenValidationError, validate_claims};
pub use config::{
    AuthConfig, AuthMode, ConfigError, LocalSettings, ManagedIdentitySettings, ProviderSettings,
};
pub use factory::create_provider;
pub use gate::{AuthError, bearer_token, enforce, optional_principal, verify_principal};
pub use principal::Principal;
pub use provider::{
    AuthProvider, IdentityAttributes, IdentityError, IdentityService, LocalCredential,
    LocalProvider, ManagedIdentityProvider, TokenVerifier,
};
pub use repository::{RepositoryError, RepositoryResult, UserRepository};
pub use roles::{Role, parse_role_list};
pub use token::{DEFAULT_TOKEN_TTL_MINUTES, MAX_TOKEN_TTL_MINUTES, TokenCodec, TokenError};
pub use user::User;
