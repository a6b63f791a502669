pub mod patient;

pub use patient::{
    Account, PatientProfile, ProfileField, ProfileUpdate, ProfileUpdateError, PublicAccount,
};
