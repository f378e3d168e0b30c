use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{token_digest, RevocationStore};
use crate::error::DatabaseError;

/// Process-local revocation store.
///
/// Maps token digest to the token's own expiry. Every operation runs under one
/// mutex, so `try_record` is a single check-and-insert. Suitable for tests and
/// single-node development runs.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    records: Mutex<HashMap<String, i64>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, i64>>, DatabaseError> {
        self.records
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("revocation store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn record(&self, token: &str, expires_at: i64) -> Result<(), DatabaseError> {
        self.lock()?.insert(token_digest(token), expires_at);
        Ok(())
    }

    async fn try_record(&self, token: &str, expires_at: i64) -> Result<bool, DatabaseError> {
        let mut records = self.lock()?;
        let digest = token_digest(token);

        if records.contains_key(&digest) {
            return Ok(false);
        }

        records.insert(digest, expires_at);
        Ok(true)
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, DatabaseError> {
        Ok(self.lock()?.contains_key(&token_digest(token)))
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, DatabaseError> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, expires_at| *expires_at >= now);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let store = InMemoryRevocationStore::new();

        store.record("token-a", 2_000).await.unwrap();
        store.record("token-a", 2_000).await.unwrap();

        assert!(store.is_revoked("token-a").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_revoked() {
        let store = InMemoryRevocationStore::new();
        assert!(!store.is_revoked("never-seen").await.unwrap());
    }

    #[tokio::test]
    async fn test_try_record_only_first_caller_wins() {
        let store = InMemoryRevocationStore::new();

        assert!(store.try_record("token-a", 2_000).await.unwrap());
        assert!(!store.try_record("token-a", 2_000).await.unwrap());
        assert!(store.is_revoked("token-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_try_record_after_record_loses() {
        let store = InMemoryRevocationStore::new();

        store.record("token-a", 2_000).await.unwrap();
        assert!(!store.try_record("token-a", 2_000).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_try_record_has_single_winner() {
        let store = Arc::new(InMemoryRevocationStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.try_record("contested", 2_000).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let store = InMemoryRevocationStore::new();
        store.record("expired", 999).await.unwrap();
        store.record("boundary", 1_000).await.unwrap();
        store.record("live", 5_000).await.unwrap();

        assert_eq!(store.purge_expired(1_000).await.unwrap(), 1);
        assert!(!store.is_revoked("expired").await.unwrap());
        assert!(store.is_revoked("boundary").await.unwrap());
        assert!(store.is_revoked("live").await.unwrap());

        assert_eq!(store.purge_expired(1_000).await.unwrap(), 0);
        assert_eq!(store.len(), 2);
    }
}
