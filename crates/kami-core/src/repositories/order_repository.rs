//! Order repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Order, OrderStats, OrderStatus};
use crate::error::DomainError;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Order>, DomainError>;
    /// Newest first.
    async fn list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<Order>, DomainError>;
    /// Oldest first, optionally scoped to a channel.
    async fn list_by_status(&self, status: OrderStatus, channel_id: Option<Uuid>) -> Result<Vec<Order>, DomainError>;
    /// Newest first.
    async fn list_by_user(&self, user_id: &Uuid) -> Result<Vec<Order>, DomainError>;
    async fn stats(&self) -> Result<OrderStats, DomainError>;

    /// Reserves the code (`available -> consuming`) and inserts `order` as one
    /// unit. Fails with `InvalidCodeStatus` if the code was taken meanwhile.
    async fn create_with_reservation(&self, code_id: &Uuid, order: &Order) -> Result<Order, DomainError>;

    /// Consumes the code (`consuming -> consumed`) and persists the completed
    /// `order` as one unit.
    async fn complete_with_consumption(&self, code_id: &Uuid, order: &Order) -> Result<Order, DomainError>;
}
