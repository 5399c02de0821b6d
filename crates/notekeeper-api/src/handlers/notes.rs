//! Note and tag HTTP handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::field::display;
use tracing::Span;
use uuid::Uuid;

use notekeeper_core::logging::NOTE_ID;
use notekeeper_core::{NoteWithTags, Tag};

use crate::error::ServiceError;
use crate::extract::Access;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoteBody {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Free-text, comma-separated.
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Deserialize)]
pub struct EditNoteBody {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// When present, replaces the note's tags.
    #[serde(default)]
    pub tags: Option<String>,
}

fn record_note(id: Uuid) {
    Span::current().record(NOTE_ID, display(id));
}

/// List the caller's notes, newest first.
///
/// GET /notes
pub async fn list_notes(
    State(state): State<AppState>,
    Access(access): Access,
) -> Result<Json<Vec<NoteWithTags>>, ServiceError> {
    Ok(Json(state.notebook.list_notes(&access).await?))
}

/// Create a note.
///
/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    Access(access): Access,
    Json(req): Json<CreateNoteBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let id = state
        .notebook
        .create_note(&access, &req.title, &req.body, &req.tags)
        .await?;
    record_note(id);
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Fetch one owned note.
///
/// GET /notes/:id
pub async fn get_note(
    State(state): State<AppState>,
    Access(access): Access,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteWithTags>, ServiceError> {
    record_note(id);
    Ok(Json(state.notebook.get_note(&access, id).await?))
}

/// Edit an owned note.
///
/// PUT /notes/:id
pub async fn edit_note(
    State(state): State<AppState>,
    Access(access): Access,
    Path(id): Path<Uuid>,
    Json(req): Json<EditNoteBody>,
) -> Result<StatusCode, ServiceError> {
    record_note(id);
    state
        .notebook
        .edit_note(&access, id, &req.title, &req.body, req.tags.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete an owned note and its tag links.
///
/// DELETE /notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    Access(access): Access,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    record_note(id);
    state.notebook.delete_note(&access, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The global tag vocabulary.
///
/// GET /tags
pub async fn list_tags(
    State(state): State<AppState>,
    Access(access): Access,
) -> Result<Json<Vec<Tag>>, ServiceError> {
    Ok(Json(state.notebook.list_tags(&access).await?))
}
