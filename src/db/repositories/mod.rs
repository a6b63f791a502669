pub mod patient;
pub mod reset_code;
