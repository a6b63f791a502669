//! `SeaORM` implementation of the `ProfileService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::db::{ProfileWrite, Store};
use crate::models::{PatientProfile, ProfileField, ProfileUpdate, PublicAccount};
use crate::services::profile_service::{ProfileError, ProfileService};

pub struct SeaOrmProfileService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl SeaOrmProfileService {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

const EMAIL_TAKEN: &str = "Email is already in use by another account";

#[async_trait]
impl ProfileService for SeaOrmProfileService {
    async fn get_full_profile(&self, id: i32) -> Result<PatientProfile, ProfileError> {
        self.store
            .get_profile(id)
            .await?
            .ok_or(ProfileError::NotFound(id))
    }

    async fn update_profile(
        &self,
        id: i32,
        update: ProfileUpdate,
    ) -> Result<PatientProfile, ProfileError> {
        let update = update.validate()?;

        // Login matches either column, so the new email must not be anyone's username.
        if let Some(Some(email)) = update.get(ProfileField::Email)
            && self.store.identifier_in_use(email, id).await?
        {
            return Err(ProfileError::Conflict(EMAIL_TAKEN.to_string()));
        }

        match self
            .store
            .update_profile(id, &update, self.clock.now())
            .await?
        {
            ProfileWrite::Updated(profile) => {
                let fields: Vec<_> = update.iter().map(|(f, _)| f.key()).collect();
                info!(user_id = id, ?fields, "Profile updated");
                Ok(profile)
            }
            ProfileWrite::NotFound => Err(ProfileError::NotFound(id)),
            ProfileWrite::EmailTaken => Err(ProfileError::Conflict(EMAIL_TAKEN.to_string())),
        }
    }

    async fn get_profile_by_id(&self, id: i32) -> Result<PatientProfile, ProfileError> {
        let profile = self.get_full_profile(id).await?;
        debug!(patient_id = id, "Profile looked up by id");
        Ok(profile)
    }

    async fn list_patients(&self) -> Result<Vec<PublicAccount>, ProfileError> {
        Ok(self.store.list_patients().await?)
    }
}
