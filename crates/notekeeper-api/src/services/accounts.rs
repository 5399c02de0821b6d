//! Account operations: registration, logins, sessions.

use tracing::{info, warn};
use zeroize::Zeroizing;

use notekeeper_auth::{
    AccessGuard, AccessState, CredentialVerifier, FederatedIdentityResolver, SessionManager,
    SessionToken,
};
use notekeeper_core::{Identity, ProviderProfile};

use crate::error::ServiceError;

/// Registration and login capabilities exposed to the HTTP layer.
pub struct AccountService {
    verifier: CredentialVerifier,
    resolver: FederatedIdentityResolver,
    sessions: SessionManager,
    guard: AccessGuard,
}

impl AccountService {
    pub fn new(
        verifier: CredentialVerifier,
        resolver: FederatedIdentityResolver,
        sessions: SessionManager,
    ) -> Self {
        let guard = AccessGuard::new(sessions.clone());
        Self {
            verifier,
            resolver,
            sessions,
            guard,
        }
    }

    /// Create a local-password identity. Refuses an email already present.
    pub async fn register_local(
        &self,
        email: &str,
        password: Zeroizing<String>,
    ) -> Result<Identity, ServiceError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ServiceError::Validation("Email is required".to_string()));
        }
        if !email.contains('@') {
            return Err(ServiceError::Validation(
                "Email must be a valid address".to_string(),
            ));
        }
        if password.trim().is_empty() {
            return Err(ServiceError::Validation("Password is required".to_string()));
        }

        Ok(self.verifier.register(email, &password).await?)
    }

    /// Check an email and password. Every credential failure is reported
    /// the same way.
    pub async fn login_local(
        &self,
        email: &str,
        password: Zeroizing<String>,
    ) -> Result<Identity, ServiceError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::AuthenticationFailure);
        }

        match self.verifier.verify(email, &password).await {
            Ok(identity) => {
                info!(
                    subsystem = "api",
                    component = "accounts",
                    op = "login",
                    identity_id = %identity.id,
                    login_method = identity.credential.login_method(),
                    "Login succeeded"
                );
                Ok(identity)
            }
            Err(e) if e.is_credential_failure() => {
                warn!(
                    subsystem = "api",
                    component = "accounts",
                    op = "login",
                    "Login failed"
                );
                Err(ServiceError::AuthenticationFailure)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a verified provider profile to an identity, creating it on
    /// first login.
    pub async fn login_federated(&self, profile: &ProviderProfile) -> Result<Identity, ServiceError> {
        let identity = self.resolver.resolve(profile).await?;
        info!(
            subsystem = "api",
            component = "accounts",
            op = "login",
            identity_id = %identity.id,
            provider = %profile.provider,
            "Federated login succeeded"
        );
        Ok(identity)
    }

    /// Issue a session for an identity that has just authenticated.
    pub async fn start_session(&self, identity: &Identity) -> Result<SessionToken, ServiceError> {
        Ok(self.sessions.serialize(identity).await?)
    }

    /// Access state for a request carrying `token`.
    pub async fn access(&self, token: Option<&str>) -> Result<AccessState, ServiceError> {
        Ok(self.guard.resolve(token).await?)
    }

    /// Identity behind a session token, if the session is valid.
    pub async fn current_identity(&self, token: &str) -> Result<Option<Identity>, ServiceError> {
        Ok(self.sessions.deserialize(token).await?)
    }

    /// Invalidate a session. Unknown or missing tokens are fine.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), ServiceError> {
        if let Some(token) = token {
            self.sessions.invalidate(token).await?;
        }
        Ok(())
    }

    /// Remove sessions that have expired.
    pub async fn purge_expired_sessions(&self) -> Result<u64, ServiceError> {
        Ok(self.sessions.purge_expired().await?)
    }

    /// Session lifetime in seconds, for cookie `Max-Age`.
    pub fn session_ttl_secs(&self) -> i64 {
        self.sessions.ttl().num_seconds()
    }
}
