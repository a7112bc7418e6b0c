//! Direct card sales delivered by e-mail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub card_name: String,
    pub activation_code: String,
    pub user_email: String,
    pub sale_price: f64,
    pub channel_id: Uuid,
    pub purchased_at: DateTime<Utc>,
}

/// Everything needed to record a sale except the code, which the
/// repository claims from stock.
#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub card_name: String,
    pub user_email: String,
    pub sale_price: f64,
    pub channel_id: Uuid,
}

impl SaleRequest {
    pub fn into_sale(self, activation_code: String, purchased_at: DateTime<Utc>) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            card_id: self.card_id,
            card_name: self.card_name,
            activation_code,
            user_email: self.user_email,
            sale_price: self.sale_price,
            channel_id: self.channel_id,
            purchased_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SaleTotals {
    pub total_sales: i64,
    pub total_revenue: f64,
    pub today_sales: i64,
    pub today_revenue: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SalesStats {
    pub total_sales: i64,
    pub total_revenue: f64,
    pub today_sales: i64,
    pub today_revenue: f64,
    pub total_stock: i64,
    pub pending_orders: i64,
}
