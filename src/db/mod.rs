use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::models::{Account, PatientProfile, ProfileUpdate, PublicAccount};

pub mod migrator;
pub mod repositories;

pub use repositories::patient::{NewAccount, ProfileWrite};
pub use repositories::reset_code::generate_reset_code;

/// Relational store holding patients and reset codes. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::with_pool_options(&config.url, config.max_connections, config.min_connections).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if let Some(path_str) = sqlite_file_path(db_url) {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every connection to an in-memory database sees its own empty database.
        let (max_connections, min_connections) = if is_sqlite_memory(db_url) {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn patient_repo(&self) -> repositories::patient::PatientRepository {
        repositories::patient::PatientRepository::new(self.conn.clone())
    }

    fn reset_code_repo(&self) -> repositories::reset_code::ResetCodeRepository {
        repositories::reset_code::ResetCodeRepository::new(self.conn.clone())
    }

    pub async fn get_account(&self, id: i32) -> Result<Option<Account>> {
        self.patient_repo().get_by_id(id).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.patient_repo().get_by_email(email).await
    }

    pub async fn get_account_by_login(&self, login: &str) -> Result<Option<Account>> {
        self.patient_repo().get_by_login(login).await
    }

    pub async fn identity_taken(&self, username: &str, email: &str) -> Result<bool> {
        self.patient_repo().identity_taken(username, email).await
    }

    pub async fn identifier_in_use(&self, identifier: &str, except: i32) -> Result<bool> {
        self.patient_repo().identifier_in_use(identifier, except).await
    }

    pub async fn create_account(
        &self,
        account: NewAccount,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        self.patient_repo().create(account, now).await
    }

    pub async fn list_patients(&self) -> Result<Vec<PublicAccount>> {
        self.patient_repo().list().await
    }

    pub async fn get_profile(&self, id: i32) -> Result<Option<PatientProfile>> {
        self.patient_repo().get_profile(id).await
    }

    pub async fn update_profile(
        &self,
        id: i32,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProfileWrite> {
        self.patient_repo().update_profile(id, update, now).await
    }

    pub async fn replace_reset_code(
        &self,
        patient_id: i32,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.reset_code_repo()
            .replace(patient_id, email, code, expires_at, now)
            .await
    }

    pub async fn is_reset_code_valid(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.reset_code_repo().is_valid(email, code, now).await
    }

    pub async fn consume_reset_code(
        &self,
        email: &str,
        code: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i32>> {
        self.reset_code_repo()
            .consume(email, code, password_hash, now)
            .await
    }
}

/// Filesystem path of a file-backed SQLite URL.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let rest = db_url.strip_prefix("sqlite:")?;
    if rest.contains(":memory:") || rest.contains("mode=memory") {
        return None;
    }
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty()).then_some(path)
}

fn is_sqlite_memory(db_url: &str) -> bool {
    db_url.starts_with("sqlite:") && sqlite_file_path(db_url).is_none()
}
