//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::constants::auth::RESET_CODE_TTL_MINUTES;
use crate::constants::mail::RESET_SUBJECT;
use crate::db::{NewAccount, Store, generate_reset_code};
use crate::models::PublicAccount;
use crate::notifier::{Notifier, template};
use crate::security::{CredentialHasher, SessionClaims, TokenIssuer};
use crate::services::auth_service::{
    AuthError, AuthService, CreateAccount, LoginResult, ResetCodeIssued,
};

pub struct SeaOrmAuthService {
    store: Store,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            notifier,
            clock,
        }
    }
}

/// Fails with `MissingFields` unless every identifier is non-blank and every
/// secret is non-empty. Secrets are never trimmed.
fn require(identifiers: &[&str], secrets: &[&str], message: &str) -> Result<(), AuthError> {
    let blank_identifier = identifiers.iter().any(|value| value.trim().is_empty());
    let empty_secret = secrets.iter().any(|value| value.is_empty());

    if blank_identifier || empty_secret {
        return Err(AuthError::MissingFields(message.to_string()));
    }
    Ok(())
}

fn record_login(outcome: &'static str) {
    metrics::counter!("auth_login_total", "outcome" => outcome).increment(1);
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, login: &str, password: &str) -> Result<LoginResult, AuthError> {
        require(&[login], &[password], "Username and password are required")?;
        let login = login.trim();

        let Some(account) = self.store.get_account_by_login(login).await? else {
            record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        let Some(hash) = account.password_hash.as_deref() else {
            record_login("no_password");
            return Err(AuthError::NoPasswordSet);
        };

        if !self.hasher.verify(password, hash).await? {
            record_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(
            account.id,
            &account.username,
            &account.email,
            self.clock.now(),
        )?;

        record_login("success");
        info!(user_id = account.id, "Login succeeded for {}", account.username);

        Ok(LoginResult {
            token,
            user: PublicAccount::from(&account),
        })
    }

    async fn create_account(&self, input: CreateAccount) -> Result<PublicAccount, AuthError> {
        require(
            &[
                input.username.as_str(),
                input.email.as_str(),
                input.full_name.as_str(),
            ],
            &[input.password.as_str()],
            "All fields are required",
        )?;

        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        if self.store.identity_taken(&username, &email).await? {
            return Err(AuthError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let password_hash = self.hasher.hash(&input.password).await?;

        let account = self
            .store
            .create_account(
                NewAccount {
                    username,
                    email,
                    password_hash,
                    full_name: input.full_name.trim().to_string(),
                },
                self.clock.now(),
            )
            .await?
            // Lost a race with a concurrent registration.
            .ok_or_else(|| AuthError::Conflict("Username or email already exists".to_string()))?;

        info!(user_id = account.id, "Created account {}", account.username);

        Ok(PublicAccount::from(&account))
    }

    async fn forgot_password(&self, email: &str) -> Result<ResetCodeIssued, AuthError> {
        require(&[email], &[], "Email is required")?;

        let account = self
            .store
            .get_account_by_email(email.trim())
            .await?
            .ok_or_else(|| AuthError::NotFound("No account found with that email".to_string()))?;

        let now = self.clock.now();
        let code = generate_reset_code();
        let expires_at = now + Duration::minutes(RESET_CODE_TTL_MINUTES);

        self.store
            .replace_reset_code(account.id, &account.email, &code, expires_at, now)
            .await?;
        metrics::counter!("auth_reset_codes_issued_total").increment(1);

        let body = template::reset_code_email(&account.full_name, &code);
        if let Err(e) = self.notifier.send(&account.email, RESET_SUBJECT, &body).await {
            metrics::counter!("notifier_failures_total").increment(1);
            warn!(user_id = account.id, "Reset code stored but not delivered: {e}");
            return Err(AuthError::DeliveryFailed(e.to_string()));
        }

        info!(user_id = account.id, "Reset code sent");

        Ok(ResetCodeIssued {
            expires_in_minutes: RESET_CODE_TTL_MINUTES,
        })
    }

    async fn verify_reset_code(&self, email: &str, code: &str) -> Result<(), AuthError> {
        require(&[email, code], &[], "Email and code are required")?;

        let valid = self
            .store
            .is_reset_code_valid(email.trim(), code.trim(), self.clock.now())
            .await?;

        if !valid {
            return Err(AuthError::InvalidOrExpired);
        }
        Ok(())
    }

    async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        require(&[email, code], &[new_password], "All fields are required")?;
        let (email, code) = (email.trim(), code.trim());

        // Cheap read first so invalid codes never pay for a hash.
        self.verify_reset_code(email, code).await?;

        let password_hash = self.hasher.hash(new_password).await?;

        let patient_id = self
            .store
            .consume_reset_code(email, code, &password_hash, self.clock.now())
            .await?
            .ok_or(AuthError::InvalidOrExpired)?;

        metrics::counter!("auth_password_resets_total").increment(1);
        info!(user_id = patient_id, "Password reset completed");

        Ok(())
    }

    fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        Ok(self.tokens.verify(token, self.clock.now())?)
    }

    async fn get_profile(&self, account_id: i32) -> Result<PublicAccount, AuthError> {
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        Ok(PublicAccount::from(&account))
    }
}
