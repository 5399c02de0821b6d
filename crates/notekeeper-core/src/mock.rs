//! In-memory store for deterministic service-level testing.
//!
//! [`MockStore`] implements every repository trait over shared in-memory
//! tables with the same observable semantics as the PostgreSQL backend:
//! unique emails and tag names, owner-scoped note operations, and
//! all-or-nothing note inserts. It also records how many store calls were
//! made and can inject failures.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use notekeeper_core::mock::MockStore;
//! use notekeeper_core::IdentityRepository;
//!
//! let store = MockStore::new();
//! let identities: Arc<dyn IdentityRepository> = Arc::new(store.clone());
//! assert_eq!(store.call_count(), 0);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::tags::TagSet;
use crate::traits::*;
use crate::uuid_utils::new_v7;

#[derive(Debug, Clone, Default)]
struct MockState {
    identities: Vec<Identity>,
    notes: HashMap<Uuid, Note>,
    tags: Vec<Tag>,
    links: BTreeSet<(Uuid, Uuid)>,
    sessions: HashMap<String, SessionRecord>,
}

impl MockState {
    fn upsert_tag(&mut self, name: &str) -> Tag {
        if let Some(existing) = self.tags.iter().find(|t| t.name == name) {
            return existing.clone();
        }
        let tag = Tag {
            id: new_v7(),
            name: name.to_string(),
        };
        self.tags.push(tag.clone());
        tag
    }

    fn tags_for(&self, note_id: Uuid) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .links
            .iter()
            .filter(|(n, _)| *n == note_id)
            .filter_map(|(_, t)| self.tags.iter().find(|tag| tag.id == *t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn owned(&self, owner_id: Uuid, note_id: Uuid) -> bool {
        self.notes
            .get(&note_id)
            .map(|n| n.owner_id == owner_id)
            .unwrap_or(false)
    }
}

/// In-memory implementation of all repository traits.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
    calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
    preempt_identity_insert: Arc<AtomicBool>,
    failing_tag: Arc<std::sync::Mutex<Option<String>>>,
}

impl MockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repository calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail as if the pool timed out.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail any note write that reaches the given (normalized) tag.
    pub fn fail_on_tag(&self, name: impl Into<String>) {
        if let Ok(mut guard) = self.failing_tag.lock() {
            *guard = Some(name.into());
        }
    }

    /// Simulate a concurrent writer: the next identity insert finds its email
    /// already claimed by another federated identity and fails with a
    /// conflict.
    pub fn preempt_next_identity_insert(&self) {
        self.preempt_identity_insert.store(true, Ordering::SeqCst);
    }

    /// Number of identities stored with the given email.
    pub async fn identity_count(&self, email: &str) -> usize {
        let state = self.state.lock().await;
        state.identities.iter().filter(|i| i.email == email).count()
    }

    /// Total number of notes across all owners.
    pub async fn note_count(&self) -> usize {
        self.state.lock().await.notes.len()
    }

    /// Total number of note-tag links.
    pub async fn link_count(&self) -> usize {
        self.state.lock().await.links.len()
    }

    /// Number of stored sessions (expired or not).
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Force a stored session to expire at the given instant.
    pub async fn expire_session(&self, token_hash: &str, at: DateTime<Utc>) {
        if let Some(record) = self.state.lock().await.sessions.get_mut(token_hash) {
            record.expires_at_utc = at;
        }
    }

    /// Remove an identity, leaving its sessions behind.
    pub async fn remove_identity(&self, id: Uuid) {
        self.state.lock().await.identities.retain(|i| i.id != id);
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn check_tags(&self, tags: &TagSet) -> Result<()> {
        let failing = self.failing_tag.lock().ok().and_then(|g| g.clone());
        match failing {
            Some(name) if tags.contains(&name) => Err(Error::Database(sqlx::Error::Protocol(
                format!("injected failure on tag '{}'", name),
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityRepository for MockStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        self.enter()?;
        let state = self.state.lock().await;
        Ok(state.identities.iter().find(|i| i.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        self.enter()?;
        let state = self.state.lock().await;
        Ok(state.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn insert(&self, req: NewIdentity) -> Result<Identity> {
        self.enter()?;
        let mut state = self.state.lock().await;

        if self.preempt_identity_insert.swap(false, Ordering::SeqCst)
            && !state.identities.iter().any(|i| i.email == req.email)
        {
            state.identities.push(Identity {
                id: new_v7(),
                email: req.email.clone(),
                credential: Credential::Federated("concurrent".to_string()),
                created_at_utc: Utc::now(),
            });
        }

        if state.identities.iter().any(|i| i.email == req.email) {
            return Err(Error::Conflict("identities_email_key".to_string()));
        }

        let identity = Identity {
            id: new_v7(),
            email: req.email,
            credential: req.credential,
            created_at_utc: Utc::now(),
        };
        state.identities.push(identity.clone());
        Ok(identity)
    }
}

#[async_trait]
impl NoteRepository for MockStore {
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Uuid> {
        self.enter()?;
        let mut state = self.state.lock().await;
        if !state.identities.iter().any(|i| i.id == owner_id) {
            return Err(Error::Database(sqlx::Error::Protocol(
                "notes_owner_id_fkey".to_string(),
            )));
        }

        // Stage on a copy so a failing tag leaves no trace.
        let mut staged = state.clone();
        let now = Utc::now();
        let id = new_v7();
        staged.notes.insert(
            id,
            Note {
                id,
                owner_id,
                title: req.title,
                body: req.body,
                created_at_utc: now,
                updated_at_utc: now,
            },
        );
        self.check_tags(&req.tags)?;
        for name in req.tags.iter() {
            let tag = staged.upsert_tag(name);
            staged.links.insert((id, tag.id));
        }

        *state = staged;
        Ok(id)
    }

    async fn fetch_owned(&self, owner_id: Uuid, note_id: Uuid) -> Result<Option<NoteWithTags>> {
        self.enter()?;
        let state = self.state.lock().await;
        if !state.owned(owner_id, note_id) {
            return Ok(None);
        }
        Ok(state.notes.get(&note_id).map(|note| NoteWithTags {
            note: note.clone(),
            tags: state.tags_for(note_id),
        }))
    }

    async fn update_owned(
        &self,
        owner_id: Uuid,
        note_id: Uuid,
        req: UpdateNoteRequest,
    ) -> Result<bool> {
        self.enter()?;
        let mut state = self.state.lock().await;
        if !state.owned(owner_id, note_id) {
            return Ok(false);
        }

        let mut staged = state.clone();
        if let Some(note) = staged.notes.get_mut(&note_id) {
            note.title = req.title;
            note.body = req.body;
            note.updated_at_utc = Utc::now();
        }
        if let Some(tags) = req.tags {
            self.check_tags(&tags)?;
            staged.links.retain(|(n, _)| *n != note_id);
            for name in tags.iter() {
                let tag = staged.upsert_tag(name);
                staged.links.insert((note_id, tag.id));
            }
        }

        *state = staged;
        Ok(true)
    }

    async fn delete_owned(&self, owner_id: Uuid, note_id: Uuid) -> Result<bool> {
        self.enter()?;
        let mut state = self.state.lock().await;
        if !state.owned(owner_id, note_id) {
            return Ok(false);
        }
        state.links.retain(|(n, _)| *n != note_id);
        state.notes.remove(&note_id);
        Ok(true)
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<NoteWithTags>> {
        self.enter()?;
        let state = self.state.lock().await;
        let mut notes: Vec<&Note> = state
            .notes
            .values()
            .filter(|n| n.owner_id == owner_id)
            .collect();
        notes.sort_by(|a, b| {
            b.created_at_utc
                .cmp(&a.created_at_utc)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(notes
            .into_iter()
            .map(|note| NoteWithTags {
                note: note.clone(),
                tags: state.tags_for(note.id),
            })
            .collect())
    }
}

#[async_trait]
impl TagRepository for MockStore {
    async fn list(&self) -> Result<Vec<Tag>> {
        self.enter()?;
        let state = self.state.lock().await;
        let mut tags = state.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.enter()?;
        let state = self.state.lock().await;
        Ok(state.tags.iter().find(|t| t.name == name).cloned())
    }
}

#[async_trait]
impl SessionRepository for MockStore {
    async fn insert(&self, record: SessionRecord) -> Result<()> {
        self.enter()?;
        let mut state = self.state.lock().await;
        if state.sessions.contains_key(&record.token_hash) {
            return Err(Error::Conflict("sessions_pkey".to_string()));
        }
        state.sessions.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_active(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        self.enter()?;
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .get(token_hash)
            .filter(|r| r.expires_at_utc > now)
            .map(|r| r.identity_id))
    }

    async fn delete(&self, token_hash: &str) -> Result<bool> {
        self.enter()?;
        let mut state = self.state.lock().await;
        Ok(state.sessions.remove(token_hash).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.enter()?;
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, r| r.expires_at_utc > now);
        Ok((before - state.sessions.len()) as u64)
    }
}
