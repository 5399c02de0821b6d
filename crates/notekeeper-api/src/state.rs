//! Shared application state handed to every handler.

use std::sync::Arc;

use notekeeper_auth::{
    CredentialVerifier, FederatedIdentityResolver, IdentityProvider, PasswordHasher,
    SessionManager,
};
use notekeeper_core::{IdentityRepository, NoteRepository, SessionRepository, TagRepository};
use notekeeper_db::{
    Database, PgIdentityRepository, PgNoteRepository, PgSessionRepository, PgTagRepository,
};

use crate::services::{AccountService, NotebookService};

/// The store seams the services are built on.
#[derive(Clone)]
pub struct Repositories {
    pub identities: Arc<dyn IdentityRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Repositories {
    /// PostgreSQL repositories sharing the database pool.
    pub fn from_database(db: &Database) -> Self {
        Self {
            identities: Arc::new(PgIdentityRepository::new(db.pool.clone())),
            notes: Arc::new(PgNoteRepository::new(db.pool.clone())),
            tags: Arc::new(PgTagRepository::new(db.pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(db.pool.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub notebook: Arc<NotebookService>,
    /// Federated login provider; `None` disables the `/auth/google` routes.
    pub google: Option<Arc<dyn IdentityProvider>>,
    /// Add `Secure` to cookies.
    pub cookie_secure: bool,
    /// Where the browser lands after a federated login.
    pub post_login_redirect: String,
}

impl AppState {
    pub fn new(repos: Repositories, hasher: PasswordHasher, session_ttl: chrono::Duration) -> Self {
        let sessions = SessionManager::new(repos.sessions, repos.identities.clone(), session_ttl);
        let accounts = AccountService::new(
            CredentialVerifier::new(repos.identities.clone(), hasher),
            FederatedIdentityResolver::new(repos.identities),
            sessions,
        );

        Self {
            accounts: Arc::new(accounts),
            notebook: Arc::new(NotebookService::new(repos.notes, repos.tags)),
            google: None,
            cookie_secure: true,
            post_login_redirect: "/notes".to_string(),
        }
    }

    pub fn with_google(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.google = Some(provider);
        self
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn with_post_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.post_login_redirect = path.into();
        self
    }
}
