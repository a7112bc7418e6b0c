//! # Kami Core - Domain Module
//!
//! Domain entities for the redemption platform.

pub mod user;
pub mod channel;
pub mod card;
pub mod activation_code;
pub mod order;
pub mod proxy;
pub mod sale;

// Re-export all entities and enums
pub use user::{Role, User, UserStatus};
pub use channel::Channel;
pub use card::{Card, CardChanges, CardWithStock};
pub use activation_code::{ActivationCode, CodeCheck, CodeFilter, CodeStatus};
pub use order::{Order, OrderStats, OrderStatus, OrderView};
pub use proxy::{
    CardConsumption, ProxyCardAssociation, ProxyCards, RevenueQuery, RevenueReport,
    RevenueSummary, RevenueWindow,
};
pub use sale::{Sale, SaleRequest, SaleTotals, SalesStats};
