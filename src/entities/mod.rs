pub mod prelude;

pub mod password_reset_codes;
pub mod patients;
