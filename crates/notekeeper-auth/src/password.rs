//! Password hashing using Argon2id.
//!
//! Hashes are stored in PHC string format, so the parameters a hash was
//! created with travel with it and verification keeps working after the
//! configured parameters change. All hashing runs on the blocking pool.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use once_cell::sync::OnceCell;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{AuthError, AuthResult};

const DUMMY_PASSWORD: &[u8] = b"notekeeper-timing-equalizer";

/// Argon2id parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashParams {
    /// Memory in KiB (default: 19456 = 19 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 2).
    pub iterations: u32,
    /// Parallelism degree (default: 1).
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashParams {
    /// Smallest parameters Argon2 accepts. Only for tests.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Async front for Argon2id hashing and verification.
#[derive(Clone)]
pub struct PasswordHasher {
    params: HashParams,
    dummy_hash: Arc<OnceCell<String>>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", &self.params)
            .finish()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HashParams::default())
    }
}

impl PasswordHasher {
    pub fn new(params: HashParams) -> Self {
        Self {
            params,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn params(&self) -> &HashParams {
        &self.params
    }

    /// Hash a password into a PHC string.
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || hash_blocking(&password, &params))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Compare a password against a stored PHC string in constant time.
    ///
    /// Returns `Ok(false)` on mismatch and an error only when the stored
    /// hash cannot be parsed.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> AuthResult<bool> {
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let stored_hash = stored_hash.to_string();
        tokio::task::spawn_blocking(move || verify_blocking(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Spend the same work as [`PasswordHasher::verify`] against a throwaway
    /// hash, for paths that have no stored hash to compare with.
    pub async fn verify_dummy(&self, password: &str) -> AuthResult<()> {
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let params = self.params.clone();
        let cell = Arc::clone(&self.dummy_hash);
        tokio::task::spawn_blocking(move || {
            let dummy = cell.get_or_try_init(|| hash_blocking(DUMMY_PASSWORD, &params))?;
            verify_blocking(&password, dummy).map(|_| ())
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Compute the throwaway hash ahead of the first login.
    pub async fn warm_up(&self) -> AuthResult<()> {
        self.verify_dummy("").await
    }
}

fn build_argon2(params: &HashParams) -> AuthResult<Argon2<'static>> {
    let argon2_params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params))
}

fn hash_blocking(password: &[u8], params: &HashParams) -> AuthResult<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AuthError::Hashing(e.to_string()))?;

    let hash = build_argon2(params)?
        .hash_password(password, &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_blocking(password: &[u8], stored_hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default().verify_password(password, &parsed).is_ok())
}
