//! Redis-backed stores

pub mod redis_code_store;

pub use redis_code_store::{create_redis_pool, RedisVerificationCodeStore};
