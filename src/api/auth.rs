use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::extract::ApiJson;
use super::{
    ApiError, ApiResponse, AppState, CodeValidResponse, MessageResponse, ResetCodeSentResponse,
};
use crate::models::PublicAccount;
use crate::security::SessionClaims;
use crate::services::{AuthError, CreateAccount, LoginResult};

// ============================================================================
// Request Types
// ============================================================================

// Every field is optional so that absent, null and blank values all surface as
// the same "required" error from the service.

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "login")]
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "nombre_completo", alias = "fullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    #[serde(alias = "newPassword")]
    pub new_password: Option<String>,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingFields(msg) => Self::validation(msg),
            AuthError::InvalidCredentials | AuthError::NoPasswordSet => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::Conflict(msg) => Self::Conflict(msg),
            AuthError::NotFound(msg) => Self::NotFound(msg),
            AuthError::InvalidOrExpired => Self::validation(err.to_string()),
            AuthError::DeliveryFailed(msg) => Self::mail_error(msg),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                Self::Forbidden("Invalid or expired token".to_string())
            }
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

fn field(value: Option<&String>) -> &str {
    value.map_or("", String::as_str)
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <token>`.
///
/// A missing token is 401. A token that fails verification is 403. On success the
/// decoded [`SessionClaims`] are available to handlers as an extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Err(ApiError::Unauthorized("Access token required".to_string()));
    };

    let claims = state.auth_service().verify_token(token)?;
    let user_id = claims.account_id().map_err(AuthError::from)?;

    tracing::Span::current().record("user_id", user_id);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with a username or email and a password, returns a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    let result = state
        .auth_service()
        .login(
            field(payload.username.as_ref()),
            field(payload.password.as_ref()),
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/create-user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateAccount {
        username: payload.username.unwrap_or_default(),
        email: payload.email.unwrap_or_default(),
        password: payload.password.unwrap_or_default(),
        full_name: payload.full_name.unwrap_or_default(),
    };

    let account = state.auth_service().create_account(input).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(account))))
}

/// POST /auth/forgot-password
/// Emails a fresh six-digit reset code, replacing any earlier one
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<ResetCodeSentResponse>>, ApiError> {
    let issued = state
        .auth_service()
        .forgot_password(field(payload.email.as_ref()))
        .await?;

    Ok(Json(ApiResponse::success(ResetCodeSentResponse {
        message: "Reset code sent to your email".to_string(),
        expires_in_minutes: issued.expires_in_minutes,
    })))
}

/// POST /auth/verify-reset-code
pub async fn verify_reset_code(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<VerifyCodeRequest>,
) -> Result<Json<ApiResponse<CodeValidResponse>>, ApiError> {
    state
        .auth_service()
        .verify_reset_code(
            field(payload.email.as_ref()),
            field(payload.code.as_ref()),
        )
        .await?;

    Ok(Json(ApiResponse::success(CodeValidResponse { valid: true })))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .reset_password(
            field(payload.email.as_ref()),
            field(payload.code.as_ref()),
            field(payload.new_password.as_ref()),
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// GET /auth/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ApiResponse<PublicAccount>>, ApiError> {
    let account = state
        .auth_service()
        .get_profile(claims.account_id().map_err(AuthError::from)?)
        .await?;

    Ok(Json(ApiResponse::success(account)))
}
