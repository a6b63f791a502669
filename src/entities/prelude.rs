pub use super::password_reset_codes::Entity as PasswordResetCodes;
pub use super::patients::Entity as Patients;
