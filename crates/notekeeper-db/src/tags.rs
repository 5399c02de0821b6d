//! Tag repository implementation and the transactional tag linker.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::trace;
use uuid::Uuid;

use notekeeper_core::{new_v7, Error, Result, Tag, TagRepository, TagSet};

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|row| Tag {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }
}

/// Upsert each tag and link it to the note, inside the caller's transaction.
///
/// Tags are processed in sorted order. Existing tags are reused; a tag that
/// a concurrent transaction inserts first is picked up through the conflict
/// arm, so two writers never create duplicate names. Any failure leaves the
/// transaction to be rolled back by the caller.
pub async fn link_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    note_id: Uuid,
    tags: &TagSet,
) -> Result<Vec<Tag>> {
    let mut linked = Vec::with_capacity(tags.len());

    for name in tags.iter() {
        let row = sqlx::query(
            "INSERT INTO tags (id, name) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name",
        )
        .bind(new_v7())
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let tag = Tag {
            id: row.get("id"),
            name: row.get("name"),
        };

        sqlx::query(
            "INSERT INTO note_tags (note_id, tag_id) VALUES ($1, $2)
             ON CONFLICT (note_id, tag_id) DO NOTHING",
        )
        .bind(note_id)
        .bind(tag.id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        trace!(
            subsystem = "database",
            component = "tags",
            op = "link",
            note_id = %note_id,
            tag = %tag.name,
            "Linked tag"
        );
        linked.push(tag);
    }

    Ok(linked)
}

/// Remove every tag link of a note. Tags themselves stay.
pub async fn unlink_all_tx(tx: &mut Transaction<'_, Postgres>, note_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(result.rows_affected())
}

/// Load the tags of several notes in one query, each list ordered by name.
pub async fn tags_for_notes_tx(
    tx: &mut Transaction<'_, Postgres>,
    note_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Tag>>> {
    let mut by_note: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    if note_ids.is_empty() {
        return Ok(by_note);
    }

    let rows = sqlx::query(
        "SELECT nt.note_id, t.id, t.name
         FROM note_tags nt
         JOIN tags t ON t.id = nt.tag_id
         WHERE nt.note_id = ANY($1)
         ORDER BY t.name",
    )
    .bind(note_ids)
    .fetch_all(&mut **tx)
    .await
    .map_err(Error::Database)?;

    for row in rows {
        by_note.entry(row.get("note_id")).or_default().push(Tag {
            id: row.get("id"),
            name: row.get("name"),
        });
    }
    Ok(by_note)
}
