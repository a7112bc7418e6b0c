//! Liveness probe

use axum::Json;
use serde::Serialize;

use crate::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/v1/health
pub async fn health() -> Json<ApiResponse<Health>> {
    Json(ApiResponse::success(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
