//! Channel repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Channel;
use crate::error::DomainError;

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Channel>, DomainError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Channel>, DomainError>;
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Channel>, DomainError>;
    async fn create(&self, channel: &Channel) -> Result<Channel, DomainError>;
    async fn update(&self, channel: &Channel) -> Result<Channel, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError>;
}
