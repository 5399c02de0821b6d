//! Identity repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use notekeeper_core::{
    new_v7, Credential, Error, Identity, IdentityRepository, NewIdentity, Result,
};

/// PostgreSQL implementation of IdentityRepository.
pub struct PgIdentityRepository {
    pool: Pool<Postgres>,
}

impl PgIdentityRepository {
    /// Create a new PgIdentityRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_identity(row: PgRow) -> Result<Identity> {
    let kind: String = row.get("credential_kind");
    let data: String = row.get("credential_data");
    Ok(Identity {
        id: row.get("id"),
        email: row.get("email"),
        credential: Credential::from_parts(&kind, data)?,
        created_at_utc: row.get("created_at_utc"),
    })
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let row = sqlx::query(
            "SELECT id, email, credential_kind, credential_data, created_at_utc
             FROM identities WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(map_row_to_identity).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        let row = sqlx::query(
            "SELECT id, email, credential_kind, credential_data, created_at_utc
             FROM identities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(map_row_to_identity).transpose()
    }

    async fn insert(&self, req: NewIdentity) -> Result<Identity> {
        let row = sqlx::query(
            "INSERT INTO identities (id, email, credential_kind, credential_data, created_at_utc)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, email, credential_kind, credential_data, created_at_utc",
        )
        .bind(new_v7())
        .bind(&req.email)
        .bind(req.credential.kind())
        .bind(req.credential.data())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::from_db)?;

        map_row_to_identity(row)
    }
}
