//! Card repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Card;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, Default)]
pub struct CardFilter {
    pub channel_id: Option<Uuid>,
    pub include_inactive: bool,
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Card>, DomainError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Card>, DomainError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Card>, DomainError>;
    async fn list(&self, filter: CardFilter) -> Result<Vec<Card>, DomainError>;
    async fn create(&self, card: &Card) -> Result<Card, DomainError>;
    async fn update(&self, card: &Card) -> Result<Card, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError>;
}
