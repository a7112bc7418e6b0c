//! Activation code payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateCodesRequest {
    #[validate(range(min = 1, max = 1000, message = "Count must be between 1 and 1000"))]
    pub count: u32,
    pub proxy_user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    #[serde(default)]
    pub only_unused: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExportRequest {
    #[validate(length(min = 1, message = "At least one code id is required"))]
    pub code_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CodeCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct UserCheck {
    pub available: bool,
}
