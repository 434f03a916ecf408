//! Infrastructure layer: storage adapters and external identity clients.

pub mod external;
pub mod repository;

pub use external::cognito::CognitoIdentityClient;
pub use repository::InMemoryUserRepository;
