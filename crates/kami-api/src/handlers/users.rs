//! User administration (admin only)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use kami_core::domain::User;
use kami_core::services::UserPage;
use uuid::Uuid;
use validator::Validate;

use crate::dto::users::{CreateUserRequest, ListUsersQuery, UpdateUserRequest};
use crate::error::ApiResult;
use crate::extractors::RequireAdmin;
use crate::response::{ApiResponse, Message};
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<UserPage> {
    let page = state.users.list_users(query.role, query.pagination()).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn create_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<User> {
    payload.validate()?;
    let user = state.users.create_user(payload.into()).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<User> {
    Ok(Json(ApiResponse::success(state.users.get_user(&id).await?)))
}

pub async fn update_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    payload.validate()?;
    let user = state.users.update_user(&id, payload.into()).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Message> {
    state.users.delete_user(&id).await?;
    Ok(Json(ApiResponse::success(Message::new("User deleted"))))
}
