// ============================================================================
// Kami Core - Order Entity
// File: crates/kami-core/src/domain/order.rs
// Description: Redemption request raised against one activation code
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Order {
    pub id: Uuid,
    pub activation_code: String,
    pub user_id: Uuid,
    pub channel_id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Card name must be between 1 and 100 characters"))]
    pub card_name: String,

    pub status: OrderStatus,

    #[validate(length(max = 1000, message = "Remarks too long"))]
    pub remarks: Option<String>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A freshly redeemed order. Its code has just been reserved, so the
    /// order starts out `processing`.
    pub fn processing(
        activation_code: String,
        user_id: Uuid,
        channel_id: Uuid,
        card_name: String,
        remarks: Option<String>,
    ) -> Result<Self, validator::ValidationErrors> {
        let order = Self {
            id: Uuid::new_v4(),
            activation_code,
            user_id,
            channel_id,
            card_name: card_name.trim().to_string(),
            status: OrderStatus::Processing,
            remarks: remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            created_at: Utc::now(),
            completed_at: None,
        };

        order.validate()?;
        Ok(order)
    }

    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }

    /// Marks the order completed. Remarks given here replace earlier ones.
    pub fn complete(
        &mut self,
        remarks: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.is_completed() {
            return Err(DomainError::OrderAlreadyCompleted);
        }
        let mut next = self.clone();
        if let Some(remarks) = remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) {
            next.remarks = Some(remarks);
        }
        next.validate()
            .map_err(|e| DomainError::ValidationError(e.to_string()))?;
        next.status = OrderStatus::Completed;
        next.completed_at = Some(at);
        *self = next;
        Ok(())
    }
}

/// Order enriched with the price of its card.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub pricing: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub processing_orders: i64,
    pub completed_orders: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::processing(
            "ABCD-EFGH-JKLM-NPQR".into(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Card A".into(),
            Some("  ".into()),
        )
        .unwrap()
    }

    #[test]
    fn test_new_order_is_processing() {
        let o = order();
        assert_eq!(o.status, OrderStatus::Processing);
        assert!(o.remarks.is_none());
        assert!(o.completed_at.is_none());
    }

    #[test]
    fn test_complete_once() {
        let mut o = order();
        let now = Utc::now();
        o.complete(Some("delivered".into()), now).unwrap();
        assert!(o.is_completed());
        assert_eq!(o.completed_at, Some(now));
        assert_eq!(o.remarks.as_deref(), Some("delivered"));

        assert!(matches!(
            o.complete(None, Utc::now()),
            Err(DomainError::OrderAlreadyCompleted)
        ));
    }

    #[test]
    fn test_overlong_remarks_rejected() {
        let mut o = order();
        assert!(o.complete(Some("r".repeat(1001)), Utc::now()).is_err());
        assert!(!o.is_completed());
        assert!(o.remarks.is_none());
    }
}
