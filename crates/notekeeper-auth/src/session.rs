//! Server-side sessions.
//!
//! A session token is an opaque random string handed to the client. The
//! store keeps only its SHA-256 digest together with the identity id and an
//! expiry; nothing about the credential is ever part of a session. Every
//! lookup re-reads the identity row.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use notekeeper_core::{Error, Identity, IdentityRepository, SessionRecord, SessionRepository};

use crate::error::{AuthError, AuthResult};

/// Prefix of every session token.
pub const SESSION_TOKEN_PREFIX: &str = "nk_s_";

/// Default absolute session lifetime (14 days).
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 336;

const TOKEN_BYTES: usize = 32;

/// Opaque session token as handed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; TOKEN_BYTES]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self(Zeroizing::new(format!(
            "{}{}",
            SESSION_TOKEN_PREFIX,
            URL_SAFE_NO_PAD.encode(&bytes[..])
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

/// Digest under which a token is stored.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues, resolves and revokes session tokens.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    identities: Arc<dyn IdentityRepository>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        identities: Arc<dyn IdentityRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            identities,
            ttl,
        }
    }

    /// Absolute lifetime of newly issued sessions.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Persist a session for the identity and return its token.
    pub async fn serialize(&self, identity: &Identity) -> AuthResult<SessionToken> {
        let token = SessionToken::generate();
        let now = Utc::now();
        let expires_at_utc = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| {
                AuthError::Store(Error::Internal("session expiry out of range".into()))
            })?;
        self.sessions
            .insert(SessionRecord {
                token_hash: token_digest(token.as_str()),
                identity_id: identity.id,
                created_at_utc: now,
                expires_at_utc,
            })
            .await?;

        info!(
            subsystem = "auth",
            component = "session",
            op = "issue",
            identity_id = %identity.id,
            ttl_hours = self.ttl.num_hours(),
            "Session issued"
        );
        Ok(token)
    }

    /// Resolve a token to the current identity row.
    ///
    /// Unknown, expired, malformed and orphaned tokens all yield `None`.
    pub async fn deserialize(&self, token: &str) -> AuthResult<Option<Identity>> {
        if !token.starts_with(SESSION_TOKEN_PREFIX) {
            debug!(
                subsystem = "auth",
                component = "session",
                op = "resolve",
                outcome = "malformed",
                "Session token rejected"
            );
            return Ok(None);
        }

        let digest = token_digest(token);
        let Some(identity_id) = self.sessions.find_active(&digest, Utc::now()).await? else {
            debug!(
                subsystem = "auth",
                component = "session",
                op = "resolve",
                outcome = "unknown_or_expired",
                "Session token rejected"
            );
            return Ok(None);
        };

        let identity = self.identities.find_by_id(identity_id).await?;
        if identity.is_none() {
            warn!(
                subsystem = "auth",
                component = "session",
                op = "resolve",
                identity_id = %identity_id,
                "Session references a missing identity"
            );
        }
        Ok(identity)
    }

    /// Revoke a token. Unknown tokens are not an error.
    pub async fn invalidate(&self, token: &str) -> AuthResult<()> {
        let removed = self.sessions.delete(&token_digest(token)).await?;
        debug!(
            subsystem = "auth",
            component = "session",
            op = "revoke",
            removed,
            "Session revoked"
        );
        Ok(())
    }

    /// Drop expired sessions from the store.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let purged = self.sessions.purge_expired(Utc::now()).await?;
        if purged > 0 {
            info!(
                subsystem = "auth",
                component = "session",
                op = "purge",
                purged,
                "Purged expired sessions"
            );
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notekeeper_core::mock::MockStore;
    use notekeeper_core::{Credential, NewIdentity};

    fn manager(store: &MockStore) -> SessionManager {
        SessionManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        )
    }

    async fn identity(store: &MockStore) -> Identity {
        IdentityRepository::insert(
            store,
            NewIdentity {
                email: "a@x.com".to_string(),
                credential: Credential::LocalPassword("$argon2id$secret".to_string()),
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_token_shape() {
        let token = SessionToken::generate();
        assert!(token.as_str().starts_with(SESSION_TOKEN_PREFIX));
        // 32 bytes base64url without padding
        assert_eq!(token.as_str().len(), SESSION_TOKEN_PREFIX.len() + 43);
        assert_ne!(token, SessionToken::generate());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = SessionToken::generate();
        let debug = format!("{:?}", token);
        assert!(!debug.contains(token.as_str()));
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        let digest = token_digest("nk_s_abc");
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, "nk_s_abc");
    }

    #[tokio::test]
    async fn test_serialize_then_deserialize() {
        let store = MockStore::new();
        let manager = manager(&store);
        let identity = identity(&store).await;

        let token = manager.serialize(&identity).await.unwrap();
        let resolved = manager.deserialize(token.as_str()).await.unwrap();
        assert_eq!(resolved, Some(identity));
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_error_not_panic() {
        let store = MockStore::new();
        let manager = SessionManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Duration::hours(2_000_000_000),
        );
        let identity = identity(&store).await;

        let result = manager.serialize(&identity).await;
        assert!(matches!(result, Err(AuthError::Store(Error::Internal(_)))));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_deserialize_rereads_identity() {
        let store = MockStore::new();
        let manager = manager(&store);
        let identity = identity(&store).await;
        let token = manager.serialize(&identity).await.unwrap();

        store.remove_identity(identity.id).await;
        assert_eq!(manager.deserialize(token.as_str()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let store = MockStore::new();
        let manager = manager(&store);
        let identity = identity(&store).await;
        let token = manager.serialize(&identity).await.unwrap();

        store
            .expire_session(&token_digest(token.as_str()), Utc::now() - Duration::minutes(1))
            .await;
        assert_eq!(manager.deserialize(token.as_str()).await.unwrap(), None);
        assert_eq!(manager.purge_expired().await.unwrap(), 1);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let store = MockStore::new();
        let manager = manager(&store);
        let identity = identity(&store).await;
        let token = manager.serialize(&identity).await.unwrap();

        manager.invalidate(token.as_str()).await.unwrap();
        manager.invalidate(token.as_str()).await.unwrap();
        manager.invalidate("nk_s_never-issued").await.unwrap();
        assert_eq!(manager.deserialize(token.as_str()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_token_skips_store() {
        let store = MockStore::new();
        let manager = manager(&store);
        assert_eq!(manager.deserialize("garbage").await.unwrap(), None);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_only_digest_is_stored() {
        let store = MockStore::new();
        let manager = manager(&store);
        let identity = identity(&store).await;
        let token = manager.serialize(&identity).await.unwrap();

        let by_raw = store.find_active(token.as_str(), Utc::now()).await.unwrap();
        let by_digest = store
            .find_active(&token_digest(token.as_str()), Utc::now())
            .await
            .unwrap();
        assert_eq!(by_raw, None);
        assert_eq!(by_digest, Some(identity.id));
    }
}
