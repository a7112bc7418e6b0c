//! Direct card sales

use axum::{
    extract::{Query, State},
    Json,
};
use kami_core::domain::{Sale, SalesStats};
use validator::Validate;

use crate::dto::sales::{EmailQuery, ListSalesQuery, PurchaseRequest};
use crate::error::ApiResult;
use crate::extractors::{CurrentUser, RequireAdmin};
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/sales/purchase
pub async fn purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PurchaseRequest>,
) -> ApiResult<Sale> {
    payload.validate()?;
    let sale = state.sales.purchase(&user, &payload.card_name, &payload.user_email).await?;
    Ok(Json(ApiResponse::success(sale)))
}

pub async fn list_sales(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListSalesQuery>,
) -> ApiResult<Vec<Sale>> {
    Ok(Json(ApiResponse::success(state.sales.list(query.limit, query.offset).await?)))
}

pub async fn sales_by_email(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Vec<Sale>> {
    query.validate()?;
    Ok(Json(ApiResponse::success(state.sales.by_email(&query.email).await?)))
}

pub async fn sales_stats(State(state): State<AppState>, _admin: RequireAdmin) -> ApiResult<SalesStats> {
    Ok(Json(ApiResponse::success(state.sales.stats().await?)))
}
