//! Short-lived e-mail verification codes

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::DomainError;

#[async_trait]
pub trait VerificationCodeStore: Send + Sync {
    /// Stores `code` for `email`, replacing any previous one.
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<(), DomainError>;

    /// True when `code` matches the unexpired code for `email`. A match
    /// removes the code so it cannot be replayed.
    async fn verify_and_consume(&self, email: &str, code: &str) -> Result<bool, DomainError>;

    /// Drops any pending code for `email`.
    async fn remove(&self, email: &str) -> Result<(), DomainError>;
}

/// Process-local store. Entries vanish on restart and are not shared
/// between instances.
#[derive(Default)]
pub struct InMemoryVerificationCodeStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryVerificationCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationCodeStore for InMemoryVerificationCodeStore {
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(email.to_string(), (code.to_string(), now + ttl));
        Ok(())
    }

    async fn verify_and_consume(&self, email: &str, code: &str) -> Result<bool, DomainError> {
        let mut entries = self.entries.write().await;
        let valid = match entries.get(email) {
            Some((stored, expires_at)) => stored == code && *expires_at > Instant::now(),
            None => false,
        };
        if valid {
            entries.remove(email);
        }
        Ok(valid)
    }

    async fn remove(&self, email: &str) -> Result<(), DomainError> {
        self.entries.write().await.remove(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_code_is_single_use() {
        let store = InMemoryVerificationCodeStore::new();
        store.put("a@example.com", "123456", Duration::from_secs(300)).await.unwrap();

        assert!(!store.verify_and_consume("a@example.com", "000000").await.unwrap());
        assert!(store.verify_and_consume("a@example.com", "123456").await.unwrap());
        assert!(!store.verify_and_consume("a@example.com", "123456").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_code_expires() {
        let store = InMemoryVerificationCodeStore::new();
        store.put("a@example.com", "123456", Duration::from_secs(300)).await.unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(!store.verify_and_consume("a@example.com", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn test_removed_code_no_longer_verifies() {
        let store = InMemoryVerificationCodeStore::new();
        store.put("a@example.com", "123456", Duration::from_secs(300)).await.unwrap();
        store.remove("a@example.com").await.unwrap();
        store.remove("missing@example.com").await.unwrap();

        assert!(!store.verify_and_consume("a@example.com", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn test_new_code_replaces_old() {
        let store = InMemoryVerificationCodeStore::new();
        store.put("a@example.com", "111111", Duration::from_secs(300)).await.unwrap();
        store.put("a@example.com", "222222", Duration::from_secs(300)).await.unwrap();

        assert!(!store.verify_and_consume("a@example.com", "111111").await.unwrap());
        assert!(store.verify_and_consume("a@example.com", "222222").await.unwrap());
    }
}
