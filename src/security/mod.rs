//! Credential primitives: password hashing and session tokens.

pub mod password;
pub mod token;

pub use password::CredentialHasher;
pub use token::{SessionClaims, TokenError, TokenIssuer};
