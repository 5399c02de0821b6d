//! Note repository implementation.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use notekeeper_core::{
    new_v7, CreateNoteRequest, Error, Note, NoteRepository, NoteWithTags, Result,
    UpdateNoteRequest,
};

use crate::tags::{link_tags_tx, tags_for_notes_tx, unlink_all_tx};

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_note(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        body: row.get("body"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = self.insert_tx(&mut tx, owner_id, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(id)
    }

    async fn fetch_owned(&self, owner_id: Uuid, note_id: Uuid) -> Result<Option<NoteWithTags>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.fetch_owned_tx(&mut tx, owner_id, note_id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn update_owned(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        req: UpdateNoteRequest,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let updated = self.update_owned_tx(&mut tx, owner_id, note_id, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(updated)
    }

    async fn delete_owned(&self, owner_id: Uuid, note_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let deleted = self.delete_owned_tx(&mut tx, owner_id, note_id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(deleted)
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<NoteWithTags>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let notes = self.list_for_owner_tx(&mut tx, owner_id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(notes)
    }
}

// =============================================================================
// Transaction-aware variants
// =============================================================================

impl PgNoteRepository {
    /// Insert a note and link its tags within an existing transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        req: CreateNoteRequest,
    ) -> Result<Uuid> {
        let start = Instant::now();
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO notes (id, owner_id, title, body, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(&req.title)
        .bind(&req.body)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let linked = link_tags_tx(tx, id, &req.tags).await?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = %id,
            tag_count = linked.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Inserted note"
        );
        Ok(id)
    }

    /// Fetch an owned note with its tags within an existing transaction.
    pub async fn fetch_owned_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        note_id: Uuid,
    ) -> Result<Option<NoteWithTags>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, body, created_at_utc, updated_at_utc
             FROM notes WHERE id = $1 AND owner_id = $2",
        )
        .bind(note_id)
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let note = map_row_to_note(&row);
        let mut tags = tags_for_notes_tx(tx, &[note.id]).await?;
        Ok(Some(NoteWithTags {
            tags: tags.remove(&note.id).unwrap_or_default(),
            note,
        }))
    }

    /// Update an owned note (and optionally replace its tags) within an
    /// existing transaction.
    pub async fn update_owned_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        note_id: Uuid,
        req: UpdateNoteRequest,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notes SET title = $1, body = $2, updated_at_utc = $3
             WHERE id = $4 AND owner_id = $5",
        )
        .bind(&req.title)
        .bind(&req.body)
        .bind(Utc::now())
        .bind(note_id)
        .bind(owner_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(tags) = req.tags {
            unlink_all_tx(tx, note_id).await?;
            link_tags_tx(tx, note_id, &tags).await?;
        }
        Ok(true)
    }

    /// Delete an owned note and its tag links within an existing transaction.
    ///
    /// Ownership is checked (and the row locked) before any link is removed,
    /// so a foreign note is left untouched.
    pub async fn delete_owned_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        note_id: Uuid,
    ) -> Result<bool> {
        let owned: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM notes WHERE id = $1 AND owner_id = $2 FOR UPDATE")
                .bind(note_id)
                .bind(owner_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(Error::Database)?;

        if owned.is_none() {
            return Ok(false);
        }

        let unlinked = unlink_all_tx(tx, note_id).await?;

        sqlx::query("DELETE FROM notes WHERE id = $1 AND owner_id = $2")
            .bind(note_id)
            .bind(owner_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "delete",
            note_id = %note_id,
            links_removed = unlinked,
            "Deleted note"
        );
        Ok(true)
    }

    /// List an owner's notes, newest first, within an existing transaction.
    pub async fn list_for_owner_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
    ) -> Result<Vec<NoteWithTags>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, title, body, created_at_utc, updated_at_utc
             FROM notes WHERE owner_id = $1
             ORDER BY created_at_utc DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let notes: Vec<Note> = rows.iter().map(map_row_to_note).collect();
        let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
        let mut tags = tags_for_notes_tx(tx, &ids).await?;

        Ok(notes
            .into_iter()
            .map(|note| NoteWithTags {
                tags: tags.remove(&note.id).unwrap_or_default(),
                note,
            })
            .collect())
    }
}
