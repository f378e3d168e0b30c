use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::{token_digest, RevocationStore};
use crate::error::DatabaseError;

/// Revocation store backed by the `refresh_token_revocations` table.
///
/// The primary key on `token_hash` is what makes `try_record` atomic: the
/// conditional insert either creates the row or affects nothing.
#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn record(&self, token: &str, expires_at: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_token_revocations (token_hash, expires_at, revoked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_hash) DO UPDATE SET revoked_at = EXCLUDED.revoked_at
            "#,
        )
        .bind(token_digest(token))
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn try_record(&self, token: &str, expires_at: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO refresh_token_revocations (token_hash, expires_at, revoked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_hash) DO NOTHING
            "#,
        )
        .bind(token_digest(token))
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM refresh_token_revocations WHERE token_hash = $1)",
        )
        .bind(token_digest(token))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_token_revocations WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
