//! Sale payloads

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    #[validate(length(min = 1, max = 100, message = "Card name is required"))]
    pub card_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub user_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSalesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailQuery {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}
