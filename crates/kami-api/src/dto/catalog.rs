//! Channel and card payloads

use kami_core::domain::CardChanges;
use kami_core::services::NewCard;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChannelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChannelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SkipLimitQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0, message = "Price must be greater than zero"))]
    pub price: f64,
    pub channel_id: Uuid,
}

impl From<CreateCardRequest> for NewCard {
    fn from(req: CreateCardRequest) -> Self {
        NewCard {
            name: req.name,
            description: req.description,
            price: req.price,
            channel_id: req.channel_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCardRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be greater than zero"))]
    pub price: Option<f64>,
    pub is_active: Option<bool>,
    pub channel_id: Option<Uuid>,
}

impl From<UpdateCardRequest> for CardChanges {
    fn from(req: UpdateCardRequest) -> Self {
        CardChanges {
            name: req.name,
            description: req.description,
            price: req.price,
            is_active: req.is_active,
            channel_id: req.channel_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCardsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}
