//! Note and tag operations for an authenticated identity.
//!
//! Every operation checks the access state before validating input or
//! touching the store. Note-scoped operations additionally pass the caller's
//! id to the store, which treats a foreign note exactly like a missing one.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use notekeeper_auth::AccessState;
use notekeeper_core::{
    CreateNoteRequest, NoteRepository, NoteWithTags, Tag, TagRepository, TagSet,
    UpdateNoteRequest,
};

use crate::error::ServiceError;

pub struct NotebookService {
    notes: Arc<dyn NoteRepository>,
    tags: Arc<dyn TagRepository>,
}

fn require_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

impl NotebookService {
    pub fn new(notes: Arc<dyn NoteRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self { notes, tags }
    }

    /// Create a note and link its tags. Returns the new note id.
    pub async fn create_note(
        &self,
        access: &AccessState,
        title: &str,
        body: &str,
        raw_tags: &str,
    ) -> Result<Uuid, ServiceError> {
        let identity = access.require()?;
        let title = require_title(title)?;
        let tags = TagSet::parse(raw_tags)?;
        let tag_count = tags.len();

        let start = Instant::now();
        let note_id = self
            .notes
            .insert(
                identity.id,
                CreateNoteRequest {
                    title,
                    body: body.to_string(),
                    tags,
                },
            )
            .await?;

        info!(
            subsystem = "api",
            component = "notebook",
            op = "create_note",
            identity_id = %identity.id,
            note_id = %note_id,
            tag_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note created"
        );
        Ok(note_id)
    }

    /// Fetch one owned note with its tags.
    pub async fn get_note(
        &self,
        access: &AccessState,
        note_id: Uuid,
    ) -> Result<NoteWithTags, ServiceError> {
        let identity = access.require()?;
        self.notes
            .fetch_owned(identity.id, note_id)
            .await?
            .ok_or(ServiceError::NotFoundOrNotOwned)
    }

    /// Replace title and body of an owned note. When `raw_tags` is given the
    /// note's tag links are replaced too.
    pub async fn edit_note(
        &self,
        access: &AccessState,
        note_id: Uuid,
        title: &str,
        body: &str,
        raw_tags: Option<&str>,
    ) -> Result<(), ServiceError> {
        let identity = access.require()?;
        let title = require_title(title)?;
        let tags = raw_tags.map(TagSet::parse).transpose()?;

        let updated = self
            .notes
            .update_owned(
                identity.id,
                note_id,
                UpdateNoteRequest {
                    title,
                    body: body.to_string(),
                    tags,
                },
            )
            .await?;

        if !updated {
            debug!(
                subsystem = "api",
                component = "notebook",
                op = "edit_note",
                identity_id = %identity.id,
                note_id = %note_id,
                "Note missing or not owned"
            );
            return Err(ServiceError::NotFoundOrNotOwned);
        }

        info!(
            subsystem = "api",
            component = "notebook",
            op = "edit_note",
            identity_id = %identity.id,
            note_id = %note_id,
            "Note updated"
        );
        Ok(())
    }

    /// Delete an owned note and its tag links. Tags stay in the vocabulary.
    pub async fn delete_note(&self, access: &AccessState, note_id: Uuid) -> Result<(), ServiceError> {
        let identity = access.require()?;

        if !self.notes.delete_owned(identity.id, note_id).await? {
            debug!(
                subsystem = "api",
                component = "notebook",
                op = "delete_note",
                identity_id = %identity.id,
                note_id = %note_id,
                "Note missing or not owned"
            );
            return Err(ServiceError::NotFoundOrNotOwned);
        }

        info!(
            subsystem = "api",
            component = "notebook",
            op = "delete_note",
            identity_id = %identity.id,
            note_id = %note_id,
            "Note deleted"
        );
        Ok(())
    }

    /// The caller's notes, newest first.
    pub async fn list_notes(&self, access: &AccessState) -> Result<Vec<NoteWithTags>, ServiceError> {
        let identity = access.require()?;
        let notes = self.notes.list_for_owner(identity.id).await?;
        debug!(
            subsystem = "api",
            component = "notebook",
            op = "list_notes",
            identity_id = %identity.id,
            result_count = notes.len(),
            "Listed notes"
        );
        Ok(notes)
    }

    /// The global tag vocabulary, ordered by name.
    pub async fn list_tags(&self, access: &AccessState) -> Result<Vec<Tag>, ServiceError> {
        access.require()?;
        Ok(self.tags.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notekeeper_core::mock::MockStore;
    use notekeeper_core::{Credential, Identity, IdentityRepository, NewIdentity};

    fn service(store: &MockStore) -> NotebookService {
        NotebookService::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    async fn signed_in(store: &MockStore, email: &str) -> AccessState {
        let identity: Identity = IdentityRepository::insert(
            store,
            NewIdentity {
                email: email.to_string(),
                credential: Credential::Federated("google".to_string()),
            },
        )
        .await
        .unwrap();
        AccessState::Authenticated(identity)
    }

    #[tokio::test]
    async fn test_anonymous_never_reaches_store() {
        let store = MockStore::new();
        let notebook = service(&store);
        let anon = AccessState::Anonymous;
        let id = Uuid::nil();

        let results = vec![
            notebook.create_note(&anon, "t", "b", "x").await.err(),
            notebook.get_note(&anon, id).await.err(),
            notebook.edit_note(&anon, id, "t", "b", None).await.err(),
            notebook.delete_note(&anon, id).await.err(),
            notebook.list_notes(&anon).await.err(),
            notebook.list_tags(&anon).await.err(),
        ];

        for err in results {
            assert!(matches!(err, Some(ServiceError::Unauthenticated)));
        }
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_title_is_validation_error_without_store_access() {
        let store = MockStore::new();
        let access = signed_in(&store, "a@x.com").await;
        let calls = store.call_count();

        let err = service(&store)
            .create_note(&access, "   ", "body", "")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(store.call_count(), calls);
    }

    #[tokio::test]
    async fn test_tag_normalization_collapses_duplicates() {
        let store = MockStore::new();
        let access = signed_in(&store, "a@x.com").await;
        let notebook = service(&store);

        let id = notebook
            .create_note(&access, "Plan", "", "Work, work ,WORK")
            .await
            .unwrap();

        let note = notebook.get_note(&access, id).await.unwrap();
        assert_eq!(note.tag_names(), vec!["work"]);
        assert_eq!(store.link_count().await, 1);
        assert_eq!(notebook.list_tags(&access).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_tag_rolls_back_note() {
        let store = MockStore::new();
        let access = signed_in(&store, "a@x.com").await;
        store.fail_on_tag("errand");

        let err = service(&store)
            .create_note(&access, "Shopping", "milk, eggs", "food, errand")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::StoreUnavailable));
        assert_eq!(store.note_count().await, 0);
        assert_eq!(store.link_count().await, 0);
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        let store = MockStore::new();
        let alice = signed_in(&store, "a@x.com").await;
        let bob = signed_in(&store, "b@x.com").await;
        let notebook = service(&store);

        let bobs = notebook
            .create_note(&bob, "Bob's", "private", "mine")
            .await
            .unwrap();
        notebook.create_note(&alice, "Alice's", "", "").await.unwrap();

        let edit = notebook
            .edit_note(&alice, bobs, "hijacked", "", Some(""))
            .await;
        assert!(matches!(edit, Err(ServiceError::NotFoundOrNotOwned)));

        let delete = notebook.delete_note(&alice, bobs).await;
        assert!(matches!(delete, Err(ServiceError::NotFoundOrNotOwned)));

        let view = notebook.get_note(&alice, bobs).await;
        assert!(matches!(view, Err(ServiceError::NotFoundOrNotOwned)));

        let note = notebook.get_note(&bob, bobs).await.unwrap();
        assert_eq!(note.note.title, "Bob's");
        assert_eq!(note.tag_names(), vec!["mine"]);

        let listed = notebook.list_notes(&alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].note.title, "Alice's");
    }

    #[tokio::test]
    async fn test_edit_without_tags_keeps_links() {
        let store = MockStore::new();
        let access = signed_in(&store, "a@x.com").await;
        let notebook = service(&store);
        let id = notebook
            .create_note(&access, "Plan", "v1", "work")
            .await
            .unwrap();

        notebook
            .edit_note(&access, id, "  Plan B ", "v2", None)
            .await
            .unwrap();

        let note = notebook.get_note(&access, id).await.unwrap();
        assert_eq!(note.note.title, "Plan B");
        assert_eq!(note.note.body, "v2");
        assert_eq!(note.tag_names(), vec!["work"]);

        notebook
            .edit_note(&access, id, "Plan B", "v2", Some("home, Garden"))
            .await
            .unwrap();
        let note = notebook.get_note(&access, id).await.unwrap();
        assert_eq!(note.tag_names(), vec!["garden", "home"]);
    }

    #[tokio::test]
    async fn test_overlong_tag_rejected_before_write() {
        let store = MockStore::new();
        let access = signed_in(&store, "a@x.com").await;
        let calls = store.call_count();

        let err = service(&store)
            .create_note(&access, "Title", "", &"x".repeat(101))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(store.call_count(), calls);
    }

    #[tokio::test]
    async fn test_store_outage_is_store_unavailable() {
        let store = MockStore::new();
        let access = signed_in(&store, "a@x.com").await;
        store.set_unavailable(true);

        let err = service(&store).list_notes(&access).await.unwrap_err();
        assert!(matches!(err, ServiceError::StoreUnavailable));
    }
}
