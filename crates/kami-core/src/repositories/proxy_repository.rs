//! Proxy/card association repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ProxyCardAssociation;
use crate::error::DomainError;

#[async_trait]
pub trait ProxyRepository: Send + Sync {
    async fn find(&self, proxy_user_id: &Uuid, card_id: &Uuid) -> Result<Option<ProxyCardAssociation>, DomainError>;
    async fn list_all(&self) -> Result<Vec<ProxyCardAssociation>, DomainError>;
    async fn list_by_proxy(&self, proxy_user_id: &Uuid) -> Result<Vec<ProxyCardAssociation>, DomainError>;
    async fn create(&self, association: &ProxyCardAssociation) -> Result<ProxyCardAssociation, DomainError>;
    async fn delete(&self, proxy_user_id: &Uuid, card_ids: &[Uuid]) -> Result<u64, DomainError>;
}
