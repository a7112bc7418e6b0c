//! User repository trait (port)

use async_trait::async_trait;
use kami_shared::Pagination;
use uuid::Uuid;

use crate::domain::{Role, User};
use crate::error::DomainError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    async fn create(&self, user: &User) -> Result<User, DomainError>;
    async fn update(&self, user: &User) -> Result<User, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError>;
    async fn list(&self, role: Option<Role>, page: Pagination) -> Result<Vec<User>, DomainError>;
    async fn count(&self, role: Option<Role>) -> Result<i64, DomainError>;
    /// Active staff members assigned to `channel_id`.
    async fn find_staff_by_channel(&self, channel_id: &Uuid) -> Result<Vec<User>, DomainError>;
    /// Proxies whose username or name contains `query`, case-insensitively.
    async fn search_proxies(&self, query: &str) -> Result<Vec<User>, DomainError>;
}
