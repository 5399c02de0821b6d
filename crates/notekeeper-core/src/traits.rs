//! Core traits for notekeeper abstractions.
//!
//! These traits are the store-access seams: the PostgreSQL backend in
//! `notekeeper-db` implements them, services hold them as `Arc<dyn ...>`,
//! and the `mock` feature provides in-memory versions for tests.
//!
//! Every method acquires whatever connection or transaction it needs for the
//! duration of the call and releases it before returning.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// IDENTITY REPOSITORY
// =============================================================================

/// Durable table of identities, unique by email.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Look up an identity by its exact (case-sensitive) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>>;

    /// Look up an identity by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>>;

    /// Insert a new identity.
    ///
    /// Fails with [`crate::Error::Conflict`] when the email is already taken,
    /// including when a concurrent caller won the race.
    async fn insert(&self, req: NewIdentity) -> Result<Identity>;
}

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Notes and their tag links.
///
/// Every operation that targets a single note is scoped by `owner_id`; a note
/// owned by someone else is indistinguishable from a missing one.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note and link its tags in one transaction.
    ///
    /// Tags are upserted into the global vocabulary; if any tag fails, the
    /// note and all links are rolled back.
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Uuid>;

    /// Fetch one owned note with its tags.
    async fn fetch_owned(&self, owner_id: Uuid, note_id: Uuid) -> Result<Option<NoteWithTags>>;

    /// Update title/body (and optionally the tag set) of an owned note.
    ///
    /// Returns `false` when the note does not exist or is not owned.
    async fn update_owned(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        req: UpdateNoteRequest,
    ) -> Result<bool>;

    /// Delete an owned note and its tag links together.
    ///
    /// Returns `false` (and deletes nothing) when the note does not exist or
    /// is not owned. Tags themselves are never deleted.
    async fn delete_owned(&self, owner_id: Uuid, note_id: Uuid) -> Result<bool>;

    /// List the owner's notes, newest first, each with its tags.
    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<NoteWithTags>>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Read access to the global tag vocabulary.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tags, ordered by name.
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Look up a tag by its normalized name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>>;
}

// =============================================================================
// SESSION REPOSITORY
// =============================================================================

/// A persisted session. Only the digest of the client token is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: String,
    pub identity_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
    pub expires_at_utc: DateTime<Utc>,
}

/// Server-side session store mapping token digests to identity ids.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session.
    async fn insert(&self, record: SessionRecord) -> Result<()>;

    /// Identity id of an unexpired session, if any.
    async fn find_active(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Uuid>>;

    /// Remove a session. Returns whether a row existed.
    async fn delete(&self, token_hash: &str) -> Result<bool>;

    /// Remove every session that expired before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
