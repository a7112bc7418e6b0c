//! # Kami Infrastructure
//!
//! PostgreSQL repositories, the Redis verification-code store and mail transports.

pub mod database;
pub mod cache;
pub mod mail;

pub use database::{
    create_pool, run_migrations, PgActivationCodeRepository, PgCardRepository,
    PgChannelRepository, PgOrderRepository, PgProxyRepository, PgSaleRepository,
    PgUserRepository,
};
pub use cache::{create_redis_pool, RedisVerificationCodeStore};
pub use mail::{LogMailer, SmtpMailer};
