//! Activation code repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ActivationCode, CardConsumption, CodeFilter, CodeStatus, RevenueWindow};
use crate::error::DomainError;

#[async_trait]
pub trait ActivationCodeRepository: Send + Sync {
    async fn create_batch(&self, codes: &[ActivationCode]) -> Result<Vec<ActivationCode>, DomainError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<ActivationCode>, DomainError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<ActivationCode>, DomainError>;
    /// Newest first.
    async fn list_by_card(&self, card_id: &Uuid, filter: &CodeFilter) -> Result<Vec<ActivationCode>, DomainError>;
    async fn count_by_card(&self, card_id: &Uuid, only_unused: bool) -> Result<i64, DomainError>;
    async fn delete_by_card(&self, card_id: &Uuid) -> Result<u64, DomainError>;

    /// Conditional state change: succeeds only while the stored status is
    /// still `from`. Returns `None` when the guard did not hold.
    async fn transition(
        &self,
        id: &Uuid,
        from: CodeStatus,
        to: CodeStatus,
    ) -> Result<Option<ActivationCode>, DomainError>;

    /// Available codes, optionally only those credited to one proxy.
    async fn list_available(&self, proxy_user_id: Option<Uuid>) -> Result<Vec<ActivationCode>, DomainError>;

    /// Flags codes as exported. With `proxy_user_id` only that proxy's codes change.
    async fn mark_exported(&self, ids: &[Uuid], proxy_user_id: Option<Uuid>) -> Result<u64, DomainError>;

    /// Codes that are available and unsold, for one card or across all cards.
    async fn count_stock(&self, card_id: Option<Uuid>) -> Result<i64, DomainError>;

    async fn consumed_by_proxy(
        &self,
        proxy_user_id: &Uuid,
        card_ids: &[Uuid],
        window: RevenueWindow,
    ) -> Result<Vec<CardConsumption>, DomainError>;
}
