//! The caller's own account

use axum::{extract::State, Json};
use kami_core::domain::User;
use validator::Validate;

use crate::dto::users::{ChangePasswordRequest, UpdateProfileRequest};
use crate::error::ApiResult;
use crate::extractors::CurrentUser;
use crate::response::{ApiResponse, Message};
use crate::state::AppState;

/// GET /api/v1/users/me
pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<User> {
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    payload.validate()?;
    let updated = state.users.update_profile(&user, payload.into()).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// PUT /api/v1/users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Message> {
    payload.validate()?;
    state
        .users
        .change_password(&user, &payload.old_password, &payload.new_password)
        .await?;
    Ok(Json(ApiResponse::success(Message::new("Password changed"))))
}
