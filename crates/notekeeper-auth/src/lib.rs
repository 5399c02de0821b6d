//! # notekeeper-auth
//!
//! Identity resolution and sessions for notekeeper.
//!
//! - [`CredentialVerifier`]: local password registration and login (Argon2id)
//! - [`FederatedIdentityResolver`]: provider profile to local identity
//! - [`SessionManager`]: opaque server-side session tokens
//! - [`AccessGuard`]: per-request [`AccessState`]
//! - [`GoogleProvider`]: OAuth 2.0 authorization-code client

pub mod credentials;
pub mod error;
pub mod federated;
pub mod guard;
pub mod password;
pub mod provider;
pub mod session;

pub use credentials::CredentialVerifier;
pub use error::{AuthError, AuthResult};
pub use federated::FederatedIdentityResolver;
pub use guard::{AccessDenied, AccessGuard, AccessState};
pub use password::{HashParams, PasswordHasher};
pub use provider::{
    new_state, state_matches, GoogleConfig, GoogleProvider, IdentityProvider, GOOGLE_PROVIDER,
};
pub use session::{
    token_digest, SessionManager, SessionToken, DEFAULT_SESSION_TTL_HOURS, SESSION_TOKEN_PREFIX,
};
