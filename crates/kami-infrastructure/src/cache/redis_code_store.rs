// ============================================================================
// Kami Infrastructure - Redis Verification Code Store
// File: crates/kami-infrastructure/src/cache/redis_code_store.rs
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use tracing::{debug, error};

use kami_core::error::DomainError;
use kami_core::repositories::VerificationCodeStore;
use kami_shared::config::RedisSettings;
use kami_shared::utils::mask_email;

const KEY_PREFIX: &str = "kami:verification:";

/// Deletes the key only when it still holds the submitted code.
const CONSUME_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

pub fn create_redis_pool(url: &str, settings: &RedisSettings) -> Result<Pool, DomainError> {
    let mut cfg = Config::from_url(url);
    cfg.pool = Some(PoolConfig::new(settings.max_connections));
    cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
        error!("Failed to create Redis pool: {}", e);
        DomainError::CacheError(e.to_string())
    })
}

/// Verification codes shared by every server instance, expired by Redis.
pub struct RedisVerificationCodeStore {
    pool: Pool,
}

impl RedisVerificationCodeStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn key(email: &str) -> String {
        format!("{KEY_PREFIX}{email}")
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, DomainError> {
        self.pool.get().await.map_err(|e| {
            error!("Redis pool exhausted or unreachable: {}", e);
            DomainError::CacheError(e.to_string())
        })
    }
}

fn cache_error(e: redis::RedisError) -> DomainError {
    error!("Redis command failed: {}", e);
    DomainError::CacheError(e.to_string())
}

#[async_trait]
impl VerificationCodeStore for RedisVerificationCodeStore {
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(Self::key(email))
            .arg(code)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        debug!("Stored verification code for {}", mask_email(email));
        Ok(())
    }

    async fn verify_and_consume(&self, email: &str, code: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("EVAL")
            .arg(CONSUME_SCRIPT)
            .arg(1)
            .arg(Self::key(email))
            .arg(code)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(removed == 1)
    }

    async fn remove(&self, email: &str) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(Self::key(email))
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        debug!("Discarded verification code for {}", mask_email(email));
        Ok(())
    }
}
