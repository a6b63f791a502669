use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::entities::{password_reset_codes, patients, prelude::*};
use crate::models::patient::age_on;
use crate::models::{Account, PatientProfile, ProfileField, ProfileUpdate, PublicAccount};

/// Fields needed to register a patient.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

#[derive(Debug)]
pub enum ProfileWrite {
    Updated(PatientProfile),
    NotFound,
    EmailTaken,
}

pub struct PatientRepository {
    conn: DatabaseConnection,
}

impl PatientRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Account>> {
        let patient = Patients::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query patient by ID")?;

        Ok(patient.map(Account::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let patient = Patients::find()
            .filter(patients::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query patient by email")?;

        Ok(patient.map(Account::from))
    }

    /// Login accepts either identifier in the same field.
    pub async fn get_by_login(&self, login: &str) -> Result<Option<Account>> {
        let patient = Patients::find()
            .filter(
                Condition::any()
                    .add(patients::Column::Username.eq(login))
                    .add(patients::Column::Email.eq(login)),
            )
            .order_by_asc(patients::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query patient by username or email")?;

        Ok(patient.map(Account::from))
    }

    /// Login resolves either column, so a new username or email must not match
    /// any existing username or email.
    pub async fn identity_taken(&self, username: &str, email: &str) -> Result<bool> {
        let count = Patients::find()
            .filter(
                Condition::any()
                    .add(patients::Column::Username.is_in([username, email]))
                    .add(patients::Column::Email.is_in([username, email])),
            )
            .count(&self.conn)
            .await
            .context("Failed to check for existing patient")?;

        Ok(count > 0)
    }

    /// Whether a patient other than `except` uses `identifier` as username or email.
    pub async fn identifier_in_use(&self, identifier: &str, except: i32) -> Result<bool> {
        let count = Patients::find()
            .filter(
                Condition::any()
                    .add(patients::Column::Username.eq(identifier))
                    .add(patients::Column::Email.eq(identifier)),
            )
            .filter(patients::Column::Id.ne(except))
            .count(&self.conn)
            .await
            .context("Failed to check identifier ownership")?;

        Ok(count > 0)
    }

    /// Returns `None` when the username or email is already taken.
    pub async fn create(&self, account: NewAccount, now: DateTime<Utc>) -> Result<Option<Account>> {
        let now = now.to_rfc3339();

        let active = patients::ActiveModel {
            username: Set(account.username),
            email: Set(account.email),
            password_hash: Set(Some(account.password_hash)),
            full_name: Set(account.full_name),
            active: Set(true),
            registered_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(Account::from(model))),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e).context("Failed to insert patient"),
        }
    }

    pub async fn list(&self) -> Result<Vec<PublicAccount>> {
        let rows = Patients::find()
            .order_by_asc(patients::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list patients")?;

        Ok(rows.into_iter().map(PublicAccount::from).collect())
    }

    pub async fn get_profile(&self, id: i32) -> Result<Option<PatientProfile>> {
        let patient = Patients::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query patient profile")?;

        Ok(patient.map(PatientProfile::from))
    }

    /// Write only the fields present in `update`, always refreshing `updated_at`.
    ///
    /// Changing the email also drops the patient's reset codes, which were issued
    /// to the old address.
    pub async fn update_profile(
        &self,
        id: i32,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProfileWrite> {
        let txn = self.conn.begin().await?;

        let Some(patient) = Patients::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to query patient for profile update")?
        else {
            txn.rollback().await?;
            return Ok(ProfileWrite::NotFound);
        };

        let email_changed = update
            .get(ProfileField::Email)
            .flatten()
            .is_some_and(|email| email != patient.email);

        let mut active: patients::ActiveModel = patient.into();

        for (field, value) in update.iter() {
            let value = value.map(str::to_string);
            match field {
                ProfileField::FullName => active.full_name = Set(value.unwrap_or_default()),
                ProfileField::Email => active.email = Set(value.unwrap_or_default()),
                ProfileField::BirthDate => active.birth_date = Set(value),
                ProfileField::Sex => active.sex = Set(value),
                ProfileField::DocumentNumber => active.document_number = Set(value),
                ProfileField::Address => active.address = Set(value),
                ProfileField::PrimaryPhone => active.primary_phone = Set(value),
                ProfileField::SecondaryPhone => active.secondary_phone = Set(value),
            }
        }

        if let Some(birth_date) = update.birth_date() {
            active.age = Set(birth_date.map(|date| age_on(date, now.date_naive())));
        }

        active.updated_at = Set(now.to_rfc3339());

        let model = match active.update(&txn).await {
            Ok(model) => model,
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                return Ok(ProfileWrite::EmailTaken);
            }
            Err(DbErr::RecordNotUpdated) => {
                txn.rollback().await?;
                return Ok(ProfileWrite::NotFound);
            }
            Err(e) => return Err(e).context("Failed to update patient profile"),
        };

        if email_changed {
            PasswordResetCodes::delete_many()
                .filter(password_reset_codes::Column::PatientId.eq(id))
                .exec(&txn)
                .await
                .context("Failed to drop reset codes for old email")?;
        }

        txn.commit().await?;
        Ok(ProfileWrite::Updated(PatientProfile::from(model)))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
