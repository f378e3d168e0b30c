/// Authentication module
///
/// Credential hashing, the JWT codec and the token service that issues,
/// verifies and rotates session token pairs.

mod claims;
mod jwt;
mod password;
mod token_service;

pub use claims::{Claims, TokenKind};
pub use jwt::TokenCodec;
pub use password::{validate_password_strength, CredentialHasher};
pub use token_service::{TokenPair, TokenService};
