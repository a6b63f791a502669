use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id PHC string. `None` means the account cannot log in yet.
    pub password_hash: Option<String>,

    pub full_name: String,

    pub active: bool,

    /// `YYYY-MM-DD`
    pub birth_date: Option<String>,

    /// Whole years, derived from `birth_date` on every update.
    pub age: Option<i32>,

    pub sex: Option<String>,

    pub document_number: Option<String>,

    pub address: Option<String>,

    pub primary_phone: Option<String>,

    pub secondary_phone: Option<String>,

    pub registered_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::password_reset_codes::Entity")]
    PasswordResetCodes,
}

impl Related<super::password_reset_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PasswordResetCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
