//! Proxy card bindings and revenue

use axum::{
    extract::{Path, Query, State},
    Json,
};
use kami_core::domain::{ProxyCardAssociation, ProxyCards, RevenueQuery, RevenueSummary};
use uuid::Uuid;
use validator::Validate;

use crate::dto::proxy::{CardAccess, CardIdsRequest};
use crate::error::ApiResult;
use crate::extractors::{CurrentUser, RequireAdmin, RequireProxyOrAdmin};
use crate::response::{Affected, ApiResponse};
use crate::state::AppState;

pub async fn associations(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> ApiResult<Vec<ProxyCardAssociation>> {
    Ok(Json(ApiResponse::success(state.proxies.associations().await?)))
}

pub async fn proxy_cards(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proxy_id): Path<Uuid>,
) -> ApiResult<ProxyCards> {
    Ok(Json(ApiResponse::success(state.proxies.cards_of(&user, &proxy_id).await?)))
}

pub async fn link_cards(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(proxy_id): Path<Uuid>,
    Json(payload): Json<CardIdsRequest>,
) -> ApiResult<Vec<ProxyCardAssociation>> {
    payload.validate()?;
    let created = state.proxies.link(&proxy_id, &payload.card_ids).await?;
    Ok(Json(ApiResponse::success(created)))
}

pub async fn unlink_cards(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(proxy_id): Path<Uuid>,
    Json(payload): Json<CardIdsRequest>,
) -> ApiResult<Affected> {
    payload.validate()?;
    let count = state.proxies.unlink(&proxy_id, &payload.card_ids).await?;
    Ok(Json(ApiResponse::success(Affected { count })))
}

pub async fn card_access(
    State(state): State<AppState>,
    _caller: RequireProxyOrAdmin,
    Path((proxy_id, card_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<CardAccess> {
    let has_access = state.proxies.has_card_access(&proxy_id, &card_id).await?;
    Ok(Json(ApiResponse::success(CardAccess { has_access })))
}

/// GET /api/v1/proxy/revenue
pub async fn revenue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<RevenueSummary> {
    Ok(Json(ApiResponse::success(state.proxies.revenue(&user, query).await?)))
}
