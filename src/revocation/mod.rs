//! Refresh token revocation tracking.
//!
//! A revocation record's presence is the only authority on whether a refresh
//! token may be used again. Records are keyed by the SHA-256 digest of the
//! token value (the plaintext token is never stored) and carry the token's own
//! expiry so they can be purged once the token could no longer verify anyway.

mod memory;
mod postgres;
mod sweeper;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::DatabaseError;

pub use memory::InMemoryRevocationStore;
pub use postgres::PgRevocationStore;
pub use sweeper::RevocationSweeper;

/// Persistent set of consumed or invalidated refresh tokens.
///
/// Implementations must accept concurrent readers and writers. `try_record`
/// is the one operation with a strict atomicity requirement.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Marks a token as revoked.
    ///
    /// Idempotent: recording an already-revoked token succeeds and may refresh
    /// its `revoked_at` timestamp.
    async fn record(&self, token: &str, expires_at: i64) -> Result<(), DatabaseError>;

    /// Atomically marks a token as revoked if it is not already.
    ///
    /// Returns `true` only for the caller whose insert created the record.
    /// Two concurrent calls for the same token never both return `true`.
    async fn try_record(&self, token: &str, expires_at: i64) -> Result<bool, DatabaseError>;

    /// Returns whether a record exists for the token.
    async fn is_revoked(&self, token: &str) -> Result<bool, DatabaseError>;

    /// Deletes every record whose `expires_at` is strictly before `now`.
    ///
    /// Returns the number of records removed.
    async fn purge_expired(&self, now: i64) -> Result<u64, DatabaseError>;
}

/// Digest under which a token's revocation record is stored
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_digest() {
        let first = token_digest("some.refresh.token");
        let second = token_digest("some.refresh.token");

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_ne!(first, "some.refresh.token");
    }

    #[test]
    fn test_different_tokens_different_digests() {
        assert_ne!(token_digest("token-a"), token_digest("token-b"));
    }
}
