//! Session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use notekeeper_core::{Error, Result, SessionRecord, SessionRepository};

/// PostgreSQL implementation of SessionRepository.
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, record: SessionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, identity_id, created_at_utc, expires_at_utc)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.token_hash)
        .bind(record.identity_id)
        .bind(record.created_at_utc)
        .bind(record.expires_at_utc)
        .execute(&self.pool)
        .await
        .map_err(Error::from_db)?;
        Ok(())
    }

    async fn find_active(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        sqlx::query_scalar(
            "SELECT identity_id FROM sessions WHERE token_hash = $1 AND expires_at_utc > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn delete(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at_utc <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
