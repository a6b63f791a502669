pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, CreateAccount, LoginResult, ResetCodeIssued};
pub use auth_service_impl::SeaOrmAuthService;

pub mod profile_service;
pub mod profile_service_impl;
pub use profile_service::{ProfileError, ProfileService};
pub use profile_service_impl::SeaOrmProfileService;
