use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

/// Argon2id hasher with cost parameters fixed at construction.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a salted PHC string.
    pub fn hash_sync(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// Check a password against a stored digest.
    ///
    /// A digest that cannot be parsed verifies as `false`.
    #[must_use]
    pub fn verify_sync(&self, password: &str, digest: &str) -> bool {
        let parsed_hash = match PasswordHash::new(digest) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {e}");
                return false;
            }
        };

        // Parameters embedded in the digest win over ours, so older hashes keep verifying.
        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Note: Argon2 is CPU-bound, so this runs on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let hasher = self.clone();
        let password = password.to_string();

        task::spawn_blocking(move || hasher.hash_sync(&password))
            .await
            .context("Password hashing task panicked")?
    }

    pub async fn verify(&self, password: &str, digest: &str) -> Result<bool> {
        let hasher = self.clone();
        let password = password.to_string();
        let digest = digest.to_string();

        task::spawn_blocking(move || hasher.verify_sync(&password, &digest))
            .await
            .context("Password verification task panicked")
    }
}
