//! Domain service for authentication and password recovery.
//!
//! Handles login, account creation, the reset-code lifecycle (issue, verify,
//! consume) and session-token checks.

use serde::Serialize;
use thiserror::Error;

use crate::models::PublicAccount;
use crate::security::{SessionClaims, TokenError};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    MissingFields(String),

    /// Deliberately the same for unknown accounts and wrong passwords.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account has no password set")]
    NoPasswordSet,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid or expired code")]
    InvalidOrExpired,

    #[error("Failed to deliver reset code: {0}")]
    DeliveryFailed(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Expired => Self::TokenExpired,
            TokenError::Generation(msg) => Self::Internal(msg),
        }
    }
}

/// Login result: a session token plus the public account view.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: PublicAccount,
}

/// Input for account creation.
#[derive(Debug, Clone, Default)]
pub struct CreateAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResetCodeIssued {
    pub expires_in_minutes: i64,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials given a username or an email, and issues a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the account is unknown or the
    /// password is wrong, [`AuthError::NoPasswordSet`] if the account has no hash.
    async fn login(&self, login: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the username or email is taken.
    async fn create_account(&self, input: CreateAccount) -> Result<PublicAccount, AuthError>;

    /// Issues a fresh reset code for the account owning `email`, invalidating any
    /// previous one, and emails it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DeliveryFailed`] when the email could not be sent. The
    /// stored code stays valid in that case.
    async fn forgot_password(&self, email: &str) -> Result<ResetCodeIssued, AuthError>;

    /// Read-only check that a code is unused and unexpired.
    async fn verify_reset_code(&self, email: &str, code: &str) -> Result<(), AuthError>;

    /// Consumes a valid code and rotates the password in one transaction.
    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Checks a session token's signature and expiry.
    fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError>;

    /// Gets the public view of the account a token was issued for.
    async fn get_profile(&self, account_id: i32) -> Result<PublicAccount, AuthError>;
}
