// ============================================================================
// Kami API - Card Handlers
// File: crates/kami-api/src/handlers/cards.rs
// ============================================================================
//! Card catalogue and per-card code administration

use axum::{
    extract::{Path, Query, State},
    Json,
};
use kami_core::domain::{ActivationCode, Card, CardWithStock, CodeFilter};
use uuid::Uuid;
use validator::Validate;

use crate::dto::catalog::{CreateCardRequest, ListCardsQuery, UpdateCardRequest};
use crate::dto::codes::{CodeCount, CountQuery, GenerateCodesRequest};
use crate::error::ApiResult;
use crate::extractors::{CurrentUser, RequireAdmin};
use crate::response::{Affected, ApiResponse, Message};
use crate::state::AppState;

pub async fn list_cards(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListCardsQuery>,
) -> ApiResult<Vec<Card>> {
    let cards = state.cards.list(&user, query.include_inactive).await?;
    Ok(Json(ApiResponse::success(cards)))
}

pub async fn get_card(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Card> {
    Ok(Json(ApiResponse::success(state.cards.get(&user, &id).await?)))
}

pub async fn create_card(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<CreateCardRequest>,
) -> ApiResult<Card> {
    payload.validate()?;
    let card = state.cards.create(payload.into()).await?;
    Ok(Json(ApiResponse::success(card)))
}

pub async fn update_card(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCardRequest>,
) -> ApiResult<Card> {
    payload.validate()?;
    let card = state.cards.update(&id, payload.into()).await?;
    Ok(Json(ApiResponse::success(card)))
}

pub async fn delete_card(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Message> {
    state.cards.delete(&id).await?;
    Ok(Json(ApiResponse::success(Message::new("Card deleted"))))
}

pub async fn card_stock(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<CardWithStock> {
    let card = state.cards.find(&id).await?;
    let stock = state.cards.stock(&id).await?;
    Ok(Json(ApiResponse::success(CardWithStock { card, stock })))
}

// ----------------------------------------------------------------------------
// Codes of a card
// ----------------------------------------------------------------------------

pub async fn generate_codes(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<GenerateCodesRequest>,
) -> ApiResult<Vec<ActivationCode>> {
    payload.validate()?;
    let codes = state
        .codes
        .generate(&card_id, payload.count, payload.proxy_user_id)
        .await?;
    Ok(Json(ApiResponse::success(codes)))
}

pub async fn list_codes(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(card_id): Path<Uuid>,
    Query(filter): Query<CodeFilter>,
) -> ApiResult<Vec<ActivationCode>> {
    let codes = state.codes.list_by_card(&card_id, &filter).await?;
    Ok(Json(ApiResponse::success(codes)))
}

pub async fn count_codes(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(card_id): Path<Uuid>,
    Query(query): Query<CountQuery>,
) -> ApiResult<CodeCount> {
    let count = state.codes.count_by_card(&card_id, query.only_unused).await?;
    Ok(Json(ApiResponse::success(CodeCount { count })))
}

pub async fn delete_codes(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Affected> {
    let count = state.codes.delete_by_card(&card_id).await?;
    Ok(Json(ApiResponse::success(Affected { count })))
}
