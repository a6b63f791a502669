use axum::{
    Extension, Json,
    extract::State,
};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::extract::{ApiJson, ApiPath};
use super::validation::validate_patient_id;
use super::{ApiError, ApiResponse, AppState};
use crate::models::{PatientProfile, ProfileUpdate, PublicAccount};
use crate::security::SessionClaims;
use crate::services::{AuthError, ProfileError};

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(id) => Self::not_found("Patient", id),
            ProfileError::Validation(msg) => Self::validation(msg),
            ProfileError::Conflict(msg) => Self::Conflict(msg),
            ProfileError::Database(msg) => Self::DatabaseError(msg),
            ProfileError::Internal(msg) => Self::internal(msg),
        }
    }
}

fn caller_id(claims: &SessionClaims) -> Result<i32, ApiError> {
    Ok(claims.account_id().map_err(AuthError::from)?)
}

/// Returns the full profile of the authenticated patient.
///
/// # Endpoint
/// `GET /api/profile`
pub async fn get_own_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ApiResponse<PatientProfile>>, ApiError> {
    let profile = state
        .profile_service()
        .get_full_profile(caller_id(&claims)?)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Partially updates the authenticated patient's profile.
///
/// # Endpoint
/// `PUT /api/profile`
///
/// # Request Body
/// A JSON object with any of the profile fields. Present keys are written
/// (`null` clears a nullable column), absent keys are left untouched and
/// unknown keys are ignored.
///
/// # Errors
/// Returns [`ApiError::ValidationError`] for an empty update, a non-string value
/// or a malformed birth date, and [`ApiError::Conflict`] for an email that
/// belongs to another patient.
pub async fn update_own_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> Result<Json<ApiResponse<PatientProfile>>, ApiError> {
    let update = ProfileUpdate::try_from(body).map_err(ProfileError::from)?;

    let profile = state
        .profile_service()
        .update_profile(caller_id(&claims)?, update)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Returns the full profile of any patient.
///
/// # Endpoint
/// `GET /api/profile/{id}`
pub async fn get_profile_by_id(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<PatientProfile>>, ApiError> {
    let id = validate_patient_id(id)?;
    let profile = state.profile_service().get_profile_by_id(id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Lists all patients.
///
/// # Endpoint
/// `GET /api/patients`
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PublicAccount>>>, ApiError> {
    let patients = state.profile_service().list_patients().await?;
    Ok(Json(ApiResponse::success(patients)))
}
