//! Activation code lookups and lifecycle transitions

use axum::{
    extract::{Path, State},
    Json,
};
use kami_core::domain::{ActivationCode, CodeCheck};
use kami_core::services::AvailableCodes;
use validator::Validate;

use crate::dto::codes::{ExportRequest, UserCheck};
use crate::error::ApiResult;
use crate::extractors::{CurrentUser, RequireAdmin, RequireProxyOrAdmin, RequireStaff};
use crate::response::{Affected, ApiResponse};
use crate::state::AppState;

/// GET /api/v1/codes/check/{code}
///
/// Public. Unknown and malformed codes simply report as unavailable.
pub async fn check_code(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<CodeCheck> {
    Ok(Json(ApiResponse::success(state.codes.check(&code).await?)))
}

pub async fn get_code(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(code): Path<String>,
) -> ApiResult<ActivationCode> {
    Ok(Json(ApiResponse::success(state.codes.get_by_code(&code).await?)))
}

pub async fn verify_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> ApiResult<UserCheck> {
    let available = state.codes.check_for_user(&code, &user).await?;
    Ok(Json(ApiResponse::success(UserCheck { available })))
}

pub async fn set_consuming(
    State(state): State<AppState>,
    _staff: RequireStaff,
    Path(code): Path<String>,
) -> ApiResult<ActivationCode> {
    Ok(Json(ApiResponse::success(state.codes.set_consuming(&code).await?)))
}

pub async fn set_consumed(
    State(state): State<AppState>,
    _staff: RequireStaff,
    Path(code): Path<String>,
) -> ApiResult<ActivationCode> {
    Ok(Json(ApiResponse::success(state.codes.set_consumed(&code).await?)))
}

pub async fn available_codes(
    State(state): State<AppState>,
    RequireProxyOrAdmin(user): RequireProxyOrAdmin,
) -> ApiResult<AvailableCodes> {
    Ok(Json(ApiResponse::success(state.codes.available_for(&user).await?)))
}

pub async fn export_codes(
    State(state): State<AppState>,
    RequireProxyOrAdmin(user): RequireProxyOrAdmin,
    Json(payload): Json<ExportRequest>,
) -> ApiResult<Affected> {
    payload.validate()?;
    let count = state.codes.export(&payload.code_ids, &user).await?;
    Ok(Json(ApiResponse::success(Affected { count })))
}
