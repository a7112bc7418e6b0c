//! Proxy binding payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CardIdsRequest {
    #[validate(length(min = 1, message = "At least one card id is required"))]
    pub card_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CardAccess {
    pub has_access: bool,
}
