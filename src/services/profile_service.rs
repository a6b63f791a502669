//! Domain service for patient profiles.
//!
//! Reads and partially updates the full demographic profile of a patient, and
//! lists registered patients.

use thiserror::Error;

use crate::models::{PatientProfile, ProfileUpdate, ProfileUpdateError, PublicAccount};

/// Errors specific to profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Patient not found: {0}")]
    NotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ProfileError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ProfileError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<ProfileUpdateError> for ProfileError {
    fn from(err: ProfileUpdateError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Domain service trait for patient profiles.
#[async_trait::async_trait]
pub trait ProfileService: Send + Sync {
    /// Gets every profile column of a patient, never the password hash.
    async fn get_full_profile(&self, id: i32) -> Result<PatientProfile, ProfileError>;

    /// Writes the fields present in `update` and returns the stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Conflict`] if the new email belongs to another patient.
    async fn update_profile(
        &self,
        id: i32,
        update: ProfileUpdate,
    ) -> Result<PatientProfile, ProfileError>;

    /// Looks up another patient's profile, for therapist and admin views.
    async fn get_profile_by_id(&self, id: i32) -> Result<PatientProfile, ProfileError>;

    /// Lists all patients in registration order.
    async fn list_patients(&self) -> Result<Vec<PublicAccount>, ProfileError>;
}
