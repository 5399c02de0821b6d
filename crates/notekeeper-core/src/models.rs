//! Domain models for notekeeper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::tags::TagSet;

// =============================================================================
// IDENTITY TYPES
// =============================================================================

/// How an identity proves who it is.
///
/// Exactly one variant is stored per identity. A federated-only account has
/// no local secret at all, rather than a sentinel password.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// PHC-formatted Argon2id hash of the account password.
    LocalPassword(String),
    /// Tag of the external identity provider that vouches for the email.
    Federated(String),
}

impl Credential {
    /// Stored `credential_kind` for [`Credential::LocalPassword`].
    pub const LOCAL_PASSWORD: &'static str = "local_password";
    /// Stored `credential_kind` for [`Credential::Federated`].
    pub const FEDERATED: &'static str = "federated";

    /// Rebuild a credential from its stored `(kind, data)` columns.
    pub fn from_parts(kind: &str, data: String) -> Result<Self> {
        match kind {
            Self::LOCAL_PASSWORD => Ok(Credential::LocalPassword(data)),
            Self::FEDERATED => Ok(Credential::Federated(data)),
            other => Err(Error::Internal(format!(
                "unknown credential kind '{}'",
                other
            ))),
        }
    }

    /// Value for the `credential_kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::LocalPassword(_) => Self::LOCAL_PASSWORD,
            Credential::Federated(_) => Self::FEDERATED,
        }
    }

    /// Value for the `credential_data` column.
    pub fn data(&self) -> &str {
        match self {
            Credential::LocalPassword(hash) => hash,
            Credential::Federated(provider) => provider,
        }
    }

    /// Public, secret-free description of the login method.
    pub fn login_method(&self) -> &str {
        match self {
            Credential::LocalPassword(_) => "password",
            Credential::Federated(provider) => provider,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::LocalPassword(_) => f
                .debug_tuple("LocalPassword")
                .field(&"[REDACTED]")
                .finish(),
            Credential::Federated(provider) => f.debug_tuple("Federated").field(provider).finish(),
        }
    }
}

/// A durable authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    /// Unique, case-sensitive as stored.
    pub email: String,
    pub credential: Credential,
    pub created_at_utc: DateTime<Utc>,
}

/// Request for inserting a new identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub credential: Credential,
}

/// Profile asserted by an external identity provider after its own protocol
/// exchange has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Provider tag, e.g. "google".
    pub provider: String,
    /// Provider-scoped subject identifier.
    pub subject: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note owned by exactly one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Entry in the global tag vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    /// Normalized name (trimmed, lowercase).
    pub name: String,
}

/// A note together with its linked tags, ordered by tag name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWithTags {
    #[serde(flatten)]
    pub note: Note,
    pub tags: Vec<Tag>,
}

impl NoteWithTags {
    /// Names of the linked tags.
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Request for creating a note and linking its tags.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub title: String,
    pub body: String,
    pub tags: TagSet,
}

/// Request for editing an owned note.
#[derive(Debug, Clone)]
pub struct UpdateNoteRequest {
    pub title: String,
    pub body: String,
    /// When present, replaces the note's tag links.
    pub tags: Option<TagSet>,
}
