// ============================================================================
// Kami API - Order Handlers
// File: crates/kami-api/src/handlers/orders.rs
// ============================================================================
//! Redemption orders

use axum::{
    extract::{Path, Query, State},
    Json,
};
use kami_core::domain::{OrderStats, OrderView};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::orders::{CompleteOrderRequest, CreateOrderRequest, ListOrdersQuery};
use crate::error::ApiResult;
use crate::extractors::{CurrentUser, RequireAdmin, RequireStaff};
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/orders
///
/// Reserves the code and notifies the channel's staff.
pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<OrderView> {
    payload.validate()?;
    let view = state.orders.create_order(&user, payload.into()).await?;
    info!("Order {} created by {}", view.order.id, user.username);
    Ok(Json(ApiResponse::success(view)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Vec<OrderView>> {
    let orders = state.orders.list_orders(query.status, query.limit, query.offset).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn my_orders(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Vec<OrderView>> {
    Ok(Json(ApiResponse::success(state.orders.my_orders(&user).await?)))
}

pub async fn pending_orders(State(state): State<AppState>, _admin: RequireAdmin) -> ApiResult<Vec<OrderView>> {
    Ok(Json(ApiResponse::success(state.orders.list_pending().await?)))
}

pub async fn processing_orders(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> ApiResult<Vec<OrderView>> {
    Ok(Json(ApiResponse::success(state.orders.list_processing(&user).await?)))
}

pub async fn order_stats(State(state): State<AppState>, _admin: RequireAdmin) -> ApiResult<OrderStats> {
    Ok(Json(ApiResponse::success(state.orders.stats().await?)))
}

pub async fn get_order(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderView> {
    Ok(Json(ApiResponse::success(state.orders.get_order(&user, &id).await?)))
}

/// POST /api/v1/orders/{id}/complete
pub async fn complete_order(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteOrderRequest>,
) -> ApiResult<OrderView> {
    payload.validate()?;
    let view = state.orders.complete_order(&user, &id, payload.remarks).await?;
    Ok(Json(ApiResponse::success(view)))
}
