//! Error types for authentication operations.

use thiserror::Error;

use notekeeper_core::Error;

/// Authentication errors.
///
/// The three credential failures stay distinct here so they can be logged
/// and tested; callers outside this crate collapse them into one signal.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No identity is registered under the submitted email.
    #[error("Identity not found")]
    IdentityNotFound,

    /// The identity is federated-only and has no local secret.
    #[error("Credential type mismatch")]
    CredentialTypeMismatch,

    /// The submitted secret does not match the stored hash.
    #[error("Invalid credential")]
    InvalidCredential,

    /// The email is already registered.
    #[error("Identity already exists")]
    AlreadyExists,

    /// Hashing or hash parsing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// The identity provider exchange failed or returned an unusable profile.
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// Store access failed.
    #[error("Store error: {0}")]
    Store(#[from] Error),
}

impl AuthError {
    /// Whether this is one of the credential failures that must be reported
    /// uniformly.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::IdentityNotFound
                | AuthError::CredentialTypeMismatch
                | AuthError::InvalidCredential
        )
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
