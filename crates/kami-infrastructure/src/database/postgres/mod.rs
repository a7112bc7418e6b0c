//! PostgreSQL repository implementations

pub mod user_repo_impl;
pub mod channel_repo_impl;
pub mod card_repo_impl;
pub mod activation_code_repo_impl;
pub mod order_repo_impl;
pub mod proxy_repo_impl;
pub mod sale_repo_impl;

pub use user_repo_impl::PgUserRepository;
pub use channel_repo_impl::PgChannelRepository;
pub use card_repo_impl::PgCardRepository;
pub use activation_code_repo_impl::PgActivationCodeRepository;
pub use order_repo_impl::PgOrderRepository;
pub use proxy_repo_impl::PgProxyRepository;
pub use sale_repo_impl::PgSaleRepository;

use kami_core::error::DomainError;
use tracing::error;

/// Logs the failure and maps it to `DomainError::DatabaseError`.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| {
        error!("Database error {}: {}", context, e);
        DomainError::DatabaseError(e.to_string())
    }
}

pub(crate) fn unique_constraint(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}
