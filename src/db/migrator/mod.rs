use sea_orm_migration::prelude::*;

mod m20250101_create_patients;
mod m20250102_add_password_reset_codes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_create_patients::Migration),
            Box::new(m20250102_add_password_reset_codes::Migration),
        ]
    }
}
