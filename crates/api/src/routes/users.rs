//! Account route handlers (`/api/users`).

use axum::{
    extract::{Path, State},
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crime_track_core::{Email, ResetCode, UserId};

use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::AccountService;
use crate::services::auth::validate_password;
use crate::state::AppState;

/// Expired `jwt` cookie sent on logout.
const CLEAR_JWT_COOKIE: &str = "jwt=; HttpOnly; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: Option<String>,
}

/// `code` is kept loose so that a missing or malformed code is reported as an
/// invalid code rather than a bad request.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: Option<String>,
    pub code: Option<serde_json::Value>,
}

/// `id` and `code` may also travel in the body; when present they take
/// precedence over the path segments.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPasswordRequest {
    pub id: Option<serde_json::Value>,
    pub code: Option<serde_json::Value>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub image: Option<String>,
}

/// Account details plus a freshly issued token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone_number: Option<String>,
    pub image: Option<String>,
    pub token: String,
}

impl UserPayload {
    fn issue(state: &AppState, user: User) -> Result<Self, AppError> {
        let token = state.signer().issue(user.id)?;
        Ok(Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone_number: user.phone_number,
            image: user.image,
            token,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EmailSentResponse {
    pub msg: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub id: UserId,
    pub message: &'static str,
}

// =============================================================================
// Field Validation
// =============================================================================

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

fn valid_email(value: Option<String>) -> Result<Email, AppError> {
    value
        .as_deref()
        .and_then(|v| Email::parse(v).ok())
        .ok_or_else(|| AppError::BadRequest("Please include a valid email".to_string()))
}

fn new_password(value: Option<String>) -> Result<String, AppError> {
    let password = value.unwrap_or_default();
    validate_password(&password).map_err(|e| match e {
        crate::services::AuthError::WeakPassword(message) => AppError::BadRequest(message),
        other => other.into(),
    })?;
    Ok(password)
}

fn loose_code(value: Option<serde_json::Value>) -> Option<ResetCode> {
    value.and_then(|v| serde_json::from_value(v).ok())
}

fn loose_user_id(value: serde_json::Value) -> Option<UserId> {
    match value {
        serde_json::Value::String(raw) => raw.parse().ok(),
        other => serde_json::from_value(other).ok(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/users` - register.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserPayload>), AppError> {
    let name = required(body.name, "Name is required")?;
    let email = valid_email(body.email)?;
    let password = new_password(body.password)?;

    let user = AccountService::new(&state)
        .register(name, email, &password, body.phone_number)
        .await?;

    Ok((StatusCode::CREATED, Json(UserPayload::issue(&state, user)?)))
}

/// `POST /api/users/auth` - log in.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(StatusCode, Json<UserPayload>), AppError> {
    let email = valid_email(body.email)?;
    let password = required(body.password, "Password is required")?;

    let user = AccountService::new(&state).login(&email, &password).await?;

    Ok((StatusCode::CREATED, Json(UserPayload::issue(&state, user)?)))
}

/// `PUT /api/users/profile`
pub async fn update_profile(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<UserPayload>, AppError> {
    let user = AccountService::new(&state)
        .update_profile(user, body.name, body.phone_number)
        .await?;

    Ok(Json(UserPayload::issue(&state, user)?))
}

/// `PUT /api/users/password`
pub async fn change_password(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let current = required(body.current_password, "Current password is required")?;
    let new = new_password(body.new_password)?;
    let confirm = required(body.confirm_password, "Please confirm your password")?;

    AccountService::new(&state)
        .change_password(user, &current, &new, &confirm)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully!",
    }))
}

/// `POST /api/users/logout` - clears the `jwt` cookie.
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(SET_COOKIE, CLEAR_JWT_COOKIE)],
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}

/// `POST /api/users/reset-password` - email a one-time code.
pub async fn request_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<(StatusCode, Json<EmailSentResponse>), AppError> {
    let email = valid_email(body.email)?;

    AccountService::new(&state).request_reset(&email).await?;

    Ok((
        StatusCode::CREATED,
        Json(EmailSentResponse {
            msg: "Email sent successfully!",
        }),
    ))
}

/// `POST /api/users/verify-code`
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<VerifiedResponse>, AppError> {
    let email = valid_email(body.email)?;
    let code = loose_code(body.code);

    let id = AccountService::new(&state)
        .verify_code(&email, code.as_ref())
        .await?;

    Ok(Json(VerifiedResponse {
        id,
        message: "Verified!",
    }))
}

/// `POST /api/users/update-password/{id}/{code}` - set a password with an emailed code.
pub async fn complete_reset(
    State(state): State<AppState>,
    Path((id, code)): Path<(String, String)>,
    Json(body): Json<NewPasswordRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let new = new_password(body.new_password)?;
    let confirm = required(body.confirm_password, "Please confirm your password")?;

    let user_id = match body.id {
        Some(value) => loose_user_id(value),
        None => id.parse::<UserId>().ok(),
    };
    let code = match body.code {
        Some(value) => loose_code(Some(value)),
        None => ResetCode::parse(&code).ok(),
    };

    AccountService::new(&state)
        .complete_reset(user_id, code.as_ref(), &new, &confirm)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Password successfully updated!",
        }),
    ))
}

/// `PUT /api/users/image`
pub async fn upload_image(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<ImageRequest>,
) -> Result<Json<UserPayload>, AppError> {
    let image = required(body.image, "Image is required")?;

    let user = AccountService::new(&state)
        .replace_image(user, &image)
        .await?;

    Ok(Json(UserPayload::issue(&state, user)?))
}
