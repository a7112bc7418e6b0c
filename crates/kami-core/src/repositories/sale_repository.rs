//! Sale repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Sale, SaleRequest, SaleTotals};
use crate::error::DomainError;

#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Claims one available, unsold code of the card, marks it sold and
    /// records the sale. `None` when the card has no stock left.
    async fn create_with_claim(&self, request: &SaleRequest) -> Result<Option<Sale>, DomainError>;
    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Sale>, DomainError>;
    async fn list_by_email(&self, email: &str) -> Result<Vec<Sale>, DomainError>;
    async fn totals(&self, today_start: DateTime<Utc>) -> Result<SaleTotals, DomainError>;
}
