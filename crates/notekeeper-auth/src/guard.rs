//! Per-request access state.

use notekeeper_core::Identity;

use crate::error::AuthResult;
use crate::session::SessionManager;

/// Whether the current request acts on behalf of an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    Anonymous,
    Authenticated(Identity),
}

/// Refusal for an operation attempted without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("authentication required")]
pub struct AccessDenied;

impl AccessState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AccessState::Anonymous => None,
            AccessState::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AccessState::Authenticated(_))
    }

    /// The identity, or [`AccessDenied`] when anonymous.
    ///
    /// Protected operations call this before touching the store.
    pub fn require(&self) -> Result<&Identity, AccessDenied> {
        self.identity().ok_or(AccessDenied)
    }
}

/// Resolves the access state of a request from its session token.
#[derive(Clone)]
pub struct AccessGuard {
    sessions: SessionManager,
}

impl AccessGuard {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    pub async fn resolve(&self, token: Option<&str>) -> AuthResult<AccessState> {
        let Some(token) = token else {
            return Ok(AccessState::Anonymous);
        };
        Ok(match self.sessions.deserialize(token).await? {
            Some(identity) => AccessState::Authenticated(identity),
            None => AccessState::Anonymous,
        })
    }
}
