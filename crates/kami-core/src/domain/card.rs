// ============================================================================
// Kami Core - Card Entity
// File: crates/kami-core/src/domain/card.rs
// Description: Sellable product whose stock is a pool of activation codes
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Card {
    pub id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: String,

    #[validate(range(exclusive_min = 0.0, message = "Price must be greater than zero"))]
    pub price: f64,

    pub is_active: bool,
    pub channel_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Partial update for a card. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_active: Option<bool>,
    pub channel_id: Option<Uuid>,
}

impl Card {
    pub fn new(
        name: String,
        description: String,
        price: f64,
        channel_id: Uuid,
    ) -> Result<Self, validator::ValidationErrors> {
        let card = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            price,
            is_active: true,
            channel_id,
            created_at: Utc::now(),
            modified_at: None,
        };

        card.validate()?;
        Ok(card)
    }

    pub fn apply(&mut self, changes: CardChanges) -> Result<(), validator::ValidationErrors> {
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = description.trim().to_string();
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        if let Some(channel_id) = changes.channel_id {
            self.channel_id = channel_id;
        }
        self.modified_at = Some(Utc::now());
        self.validate()
    }
}

/// Card together with its current stock.
#[derive(Debug, Clone, Serialize)]
pub struct CardWithStock {
    #[serde(flatten)]
    pub card: Card,
    pub stock: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_valid_card() {
        let card = Card::new("Card A".into(), "Monthly pass".into(), 10.0, Uuid::new_v4()).unwrap();
        assert!(card.is_active);
    }

    #[test]
    fn test_price_must_be_positive() {
        assert!(Card::new("Card A".into(), "desc".into(), 0.0, Uuid::new_v4()).is_err());
        assert!(Card::new("Card A".into(), "desc".into(), -1.0, Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_description_required() {
        assert!(Card::new("Card A".into(), "  ".into(), 5.0, Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_apply_changes() {
        let mut card = Card::new("Card A".into(), "desc".into(), 10.0, Uuid::new_v4()).unwrap();
        card.apply(CardChanges {
            price: Some(12.5),
            is_active: Some(false),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(card.price, 12.5);
        assert!(!card.is_active);

        let bad = CardChanges { price: Some(0.0), ..Default::default() };
        assert!(card.apply(bad).is_err());
    }
}
