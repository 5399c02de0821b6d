//! Federated identity resolution: provider profile to local identity.

use std::sync::Arc;

use tracing::{info, warn};

use notekeeper_core::{
    Credential, Error, Identity, IdentityRepository, NewIdentity, ProviderProfile,
};

use crate::error::{AuthError, AuthResult};

/// Maps a verified provider profile to a local identity, creating one on
/// first login.
///
/// Lookup is by email. Concurrent first logins for the same email race on
/// the store's unique constraint; the loser re-fetches the winner's row.
pub struct FederatedIdentityResolver {
    identities: Arc<dyn IdentityRepository>,
}

impl FederatedIdentityResolver {
    pub fn new(identities: Arc<dyn IdentityRepository>) -> Self {
        Self { identities }
    }

    pub async fn resolve(&self, profile: &ProviderProfile) -> AuthResult<Identity> {
        let email = profile.email.trim();
        if email.is_empty() {
            return Err(AuthError::Provider(
                "provider profile carries no email".to_string(),
            ));
        }

        if let Some(existing) = self.identities.find_by_email(email).await? {
            if let Credential::LocalPassword(_) = existing.credential {
                // Same identity, credential left as is. Whether this should
                // require explicit linking is an open product decision.
                warn!(
                    subsystem = "auth",
                    component = "federated",
                    op = "resolve",
                    identity_id = %existing.id,
                    provider = %profile.provider,
                    login_method = existing.credential.login_method(),
                    "Federated login matched a local-password identity"
                );
            }
            return Ok(existing);
        }

        let inserted = self
            .identities
            .insert(NewIdentity {
                email: email.to_string(),
                credential: Credential::Federated(profile.provider.clone()),
            })
            .await;

        match inserted {
            Ok(identity) => {
                info!(
                    subsystem = "auth",
                    component = "federated",
                    op = "create",
                    identity_id = %identity.id,
                    provider = %profile.provider,
                    "Created federated identity"
                );
                Ok(identity)
            }
            Err(Error::Conflict(_)) => {
                warn!(
                    subsystem = "auth",
                    component = "federated",
                    op = "resolve",
                    provider = %profile.provider,
                    "Concurrent first login resolved to existing identity"
                );
                self.identities
                    .find_by_email(email)
                    .await?
                    .ok_or_else(|| {
                        AuthError::Store(Error::Internal(
                            "identity missing after unique violation".to_string(),
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }
}
