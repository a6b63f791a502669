use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Store;
use crate::notifier::{self, Notifier};
use crate::security::{CredentialHasher, TokenIssuer};
use crate::services::{AuthService, ProfileService, SeaOrmAuthService, SeaOrmProfileService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub profile_service: Arc<dyn ProfileService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let notifier = notifier::from_config(&config.mail)?;
        Self::with_components(config, notifier, Arc::new(SystemClock)).await
    }

    /// Builds the state around an explicit notifier and clock.
    pub async fn with_components(
        config: Config,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let hasher = CredentialHasher::new(&config.security)?;
        let tokens = TokenIssuer::new(&config.security.signing_secret()?);

        let store = Store::from_config(&config.database).await?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            hasher,
            tokens,
            notifier,
            clock.clone(),
        )) as Arc<dyn AuthService>;

        let profile_service =
            Arc::new(SeaOrmProfileService::new(store.clone(), clock)) as Arc<dyn ProfileService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            profile_service,
        })
    }
}
