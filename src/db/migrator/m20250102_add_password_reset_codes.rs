use crate::entities::password_reset_codes;
use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

const EMAIL_CODE_INDEX: &str = "idx_password_reset_codes_email_code";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(PasswordResetCodes)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Verify and consume both look codes up by (email, code).
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(EMAIL_CODE_INDEX)
                    .table(PasswordResetCodes)
                    .col(password_reset_codes::Column::Email)
                    .col(password_reset_codes::Column::Code)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(EMAIL_CODE_INDEX)
                    .table(PasswordResetCodes)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PasswordResetCodes).to_owned())
            .await?;

        Ok(())
    }
}
