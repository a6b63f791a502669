use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

use crate::constants::auth::{RESET_CODE_DIGITS, RESET_CODE_MAX};
use crate::entities::{password_reset_codes, patients, prelude::*};

pub struct ResetCodeRepository {
    conn: DatabaseConnection,
}

impl ResetCodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Replace every code the patient has with a fresh one.
    ///
    /// The delete and insert share a transaction, so concurrent issues for the same
    /// patient serialize and leave exactly one row behind.
    pub async fn replace(
        &self,
        patient_id: i32,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        PasswordResetCodes::delete_many()
            .filter(password_reset_codes::Column::PatientId.eq(patient_id))
            .exec(&txn)
            .await
            .context("Failed to delete previous reset codes")?;

        password_reset_codes::ActiveModel {
            patient_id: Set(patient_id),
            email: Set(email.to_string()),
            code: Set(code.to_string()),
            expires_at: Set(expires_at.timestamp_millis()),
            used: Set(false),
            created_at: Set(now.to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert reset code")?;

        txn.commit().await?;
        Ok(())
    }

    /// A code is valid while it is unused and `now < expires_at`.
    pub async fn is_valid(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let count = PasswordResetCodes::find()
            .filter(password_reset_codes::Column::Email.eq(email))
            .filter(password_reset_codes::Column::Code.eq(code))
            .filter(password_reset_codes::Column::Used.eq(false))
            .filter(password_reset_codes::Column::ExpiresAt.gt(now.timestamp_millis()))
            .count(&self.conn)
            .await
            .context("Failed to look up reset code")?;

        Ok(count > 0)
    }

    /// Mark a valid code used and store the new password hash, atomically.
    ///
    /// Returns the patient id, or `None` if the code was not valid at `now`.
    pub async fn consume(
        &self,
        email: &str,
        code: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i32>> {
        let txn = self.conn.begin().await?;

        // Claim the code first: the guarded write makes a second consumer see zero rows.
        let claimed = PasswordResetCodes::update_many()
            .col_expr(password_reset_codes::Column::Used, Expr::value(true))
            .filter(password_reset_codes::Column::Email.eq(email))
            .filter(password_reset_codes::Column::Code.eq(code))
            .filter(password_reset_codes::Column::Used.eq(false))
            .filter(password_reset_codes::Column::ExpiresAt.gt(now.timestamp_millis()))
            .exec(&txn)
            .await
            .context("Failed to claim reset code")?;

        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let row = PasswordResetCodes::find()
            .filter(password_reset_codes::Column::Email.eq(email))
            .filter(password_reset_codes::Column::Code.eq(code))
            .filter(password_reset_codes::Column::Used.eq(true))
            .order_by_desc(password_reset_codes::Column::Id)
            .one(&txn)
            .await
            .context("Failed to read claimed reset code")?
            .ok_or_else(|| anyhow::anyhow!("Claimed reset code vanished"))?;

        let updated = Patients::update_many()
            .col_expr(patients::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(patients::Column::UpdatedAt, Expr::value(now.to_rfc3339()))
            .filter(patients::Column::Id.eq(row.patient_id))
            .exec(&txn)
            .await
            .context("Failed to update password")?;

        if updated.rows_affected != 1 {
            // Release the claim so the code stays usable.
            txn.rollback().await?;
            anyhow::bail!("Patient {} for reset code not found", row.patient_id);
        }

        txn.commit().await?;
        Ok(Some(row.patient_id))
    }
}

/// Uniformly random six-digit code, zero padded.
#[must_use]
pub fn generate_reset_code() -> String {
    use rand::Rng;

    let n = rand::rng().random_range(0..=RESET_CODE_MAX);
    format!("{n:0width$}", width = RESET_CODE_DIGITS)
}
