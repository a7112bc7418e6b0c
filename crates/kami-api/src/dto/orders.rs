//! Order payloads

use kami_core::domain::OrderStatus;
use kami_core::services::NewOrder;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 64, message = "Activation code is required"))]
    pub code: String,
    pub channel_id: Option<Uuid>,
    #[validate(length(max = 1000, message = "Remarks too long"))]
    pub remarks: Option<String>,
    #[validate(length(max = 100, message = "Card name too long"))]
    pub card_name: Option<String>,
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(req: CreateOrderRequest) -> Self {
        NewOrder {
            code: req.code,
            channel_id: req.channel_id,
            remarks: req.remarks,
            card_name: req.card_name,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteOrderRequest {
    #[validate(length(max = 1000, message = "Remarks too long"))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}
