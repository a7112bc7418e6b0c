// ============================================================================
// Kami API - Auth Handlers
// File: crates/kami-api/src/handlers/auth.rs
// ============================================================================
//! Login, token refresh and code-gated registration

use axum::{extract::State, Json};
use kami_core::domain::User;
use kami_core::services::AuthTokens;
use tracing::warn;
use validator::Validate;

use crate::dto::auth::{LoginRequest, RefreshRequest, RegisterRequest, SendCodeRequest};
use crate::error::{ApiError, ApiResult};
use crate::response::{ApiResponse, Message};
use crate::state::AppState;

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<AuthTokens> {
    payload.validate()?;

    let key = payload.username.trim().to_lowercase();
    if state.login_limiter.check_key(&key).is_err() {
        warn!("Login rate limit hit for {}", key);
        return Err(ApiError::TooManyRequests);
    }

    let tokens = state.auth.login(payload.username.trim(), &payload.password).await?;
    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<AuthTokens> {
    payload.validate()?;
    let tokens = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /api/v1/auth/send-code
pub async fn send_code(
    State(state): State<AppState>,
    Json(payload): Json<SendCodeRequest>,
) -> ApiResult<Message> {
    payload.validate()?;
    state.auth.send_verification_code(&payload.email).await?;
    Ok(Json(ApiResponse::success(Message::new("Verification code sent"))))
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<User> {
    payload.validate()?;
    let user = state.auth.register_with_code(payload.into()).await?;
    Ok(Json(ApiResponse::success(user)))
}
