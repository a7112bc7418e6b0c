//! Channel administration (admin only)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use kami_core::domain::Channel;
use uuid::Uuid;
use validator::Validate;

use crate::dto::catalog::{CreateChannelRequest, SkipLimitQuery, UpdateChannelRequest};
use crate::error::ApiResult;
use crate::extractors::RequireAdmin;
use crate::response::{ApiResponse, Message};
use crate::state::AppState;

pub async fn list_channels(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<SkipLimitQuery>,
) -> ApiResult<Vec<Channel>> {
    let channels = state.channels.list(query.skip, query.limit).await?;
    Ok(Json(ApiResponse::success(channels)))
}

pub async fn create_channel(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<CreateChannelRequest>,
) -> ApiResult<Channel> {
    payload.validate()?;
    let channel = state.channels.create(payload.name, payload.description).await?;
    Ok(Json(ApiResponse::success(channel)))
}

pub async fn get_channel(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Channel> {
    Ok(Json(ApiResponse::success(state.channels.get(&id).await?)))
}

pub async fn update_channel(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateChannelRequest>,
) -> ApiResult<Channel> {
    payload.validate()?;
    let channel = state.channels.update(&id, payload.name, payload.description).await?;
    Ok(Json(ApiResponse::success(channel)))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Message> {
    state.channels.delete(&id).await?;
    Ok(Json(ApiResponse::success(Message::new("Channel deleted"))))
}
