//! Local password credentials: registration and verification.

use std::sync::Arc;

use tracing::{debug, info};

use notekeeper_core::{Credential, Error, Identity, IdentityRepository, NewIdentity};

use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasher;

/// Validates (email, password) pairs against stored Argon2id hashes.
///
/// Every failure path performs one hash comparison, so an unknown email or a
/// federated-only account costs the same time as a wrong password.
pub struct CredentialVerifier {
    identities: Arc<dyn IdentityRepository>,
    hasher: PasswordHasher,
}

impl CredentialVerifier {
    pub fn new(identities: Arc<dyn IdentityRepository>, hasher: PasswordHasher) -> Self {
        Self { identities, hasher }
    }

    /// Check a submitted password for the identity registered under `email`.
    pub async fn verify(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let identity = self.identities.find_by_email(email).await?;

        let Some(identity) = identity else {
            self.hasher.verify_dummy(password).await?;
            debug!(
                subsystem = "auth",
                component = "credentials",
                op = "verify",
                outcome = "identity_not_found",
                "Credential check failed"
            );
            return Err(AuthError::IdentityNotFound);
        };

        let stored_hash = match &identity.credential {
            Credential::LocalPassword(hash) => hash,
            Credential::Federated(provider) => {
                self.hasher.verify_dummy(password).await?;
                debug!(
                    subsystem = "auth",
                    component = "credentials",
                    op = "verify",
                    outcome = "credential_type_mismatch",
                    identity_id = %identity.id,
                    provider = %provider,
                    "Credential check failed"
                );
                return Err(AuthError::CredentialTypeMismatch);
            }
        };

        if !self.hasher.verify(password, stored_hash).await? {
            debug!(
                subsystem = "auth",
                component = "credentials",
                op = "verify",
                outcome = "invalid_credential",
                identity_id = %identity.id,
                "Credential check failed"
            );
            return Err(AuthError::InvalidCredential);
        }

        Ok(identity)
    }

    /// Create an identity with a local password.
    ///
    /// Refuses with [`AuthError::AlreadyExists`] when the email is taken,
    /// whatever credential the existing identity holds. The existing row is
    /// never modified.
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let hash = self.hasher.hash(password).await?;

        let result = self
            .identities
            .insert(NewIdentity {
                email: email.to_string(),
                credential: Credential::LocalPassword(hash),
            })
            .await;

        match result {
            Ok(identity) => {
                info!(
                    subsystem = "auth",
                    component = "credentials",
                    op = "register",
                    identity_id = %identity.id,
                    "Registered local identity"
                );
                Ok(identity)
            }
            Err(Error::Conflict(_)) => Err(AuthError::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::HashParams;
    use notekeeper_core::mock::MockStore;

    fn verifier(store: &MockStore) -> CredentialVerifier {
        CredentialVerifier::new(
            Arc::new(store.clone()),
            PasswordHasher::new(HashParams::insecure_fast()),
        )
    }

    #[tokio::test]
    async fn test_register_then_verify_returns_same_identity() {
        let store = MockStore::new();
        let verifier = verifier(&store);

        let registered = verifier.register("a@x.com", "pw1").await.unwrap();
        let verified = verifier.verify("a@x.com", "pw1").await.unwrap();

        assert_eq!(registered.id, verified.id);
        assert!(matches!(verified.credential, Credential::LocalPassword(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credential() {
        let store = MockStore::new();
        let verifier = verifier(&store);
        verifier.register("a@x.com", "pw1").await.unwrap();

        let result = verifier.verify("a@x.com", "pw2").await;
        assert!(matches!(result, Err(AuthError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_unknown_email_is_identity_not_found() {
        let store = MockStore::new();
        let result = verifier(&store).verify("nobody@x.com", "pw").await;
        assert!(matches!(result, Err(AuthError::IdentityNotFound)));
    }

    #[tokio::test]
    async fn test_federated_identity_refuses_password() {
        let store = MockStore::new();
        store
            .insert(NewIdentity {
                email: "g@x.com".to_string(),
                credential: Credential::Federated("google".to_string()),
            })
            .await
            .unwrap();

        let result = verifier(&store).verify("g@x.com", "").await;
        assert!(matches!(result, Err(AuthError::CredentialTypeMismatch)));
    }

    #[tokio::test]
    async fn test_second_registration_refused_and_hash_unchanged() {
        let store = MockStore::new();
        let verifier = verifier(&store);
        let first = verifier.register("a@x.com", "pw1").await.unwrap();

        let second = verifier.register("a@x.com", "other").await;
        assert!(matches!(second, Err(AuthError::AlreadyExists)));

        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.credential, first.credential);
        assert!(verifier.verify("a@x.com", "pw1").await.is_ok());
        assert!(verifier.verify("a@x.com", "other").await.is_err());
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let store = MockStore::new();
        let verifier = verifier(&store);
        verifier.register("Ann@x.com", "pw").await.unwrap();

        let result = verifier.verify("ann@x.com", "pw").await;
        assert!(matches!(result, Err(AuthError::IdentityNotFound)));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MockStore::new();
        store.set_unavailable(true);
        let result = verifier(&store).verify("a@x.com", "pw").await;
        assert!(matches!(result, Err(AuthError::Store(_))));
    }
}
