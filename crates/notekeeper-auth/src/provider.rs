//! External identity provider client (OAuth 2.0 authorization-code flow).
//!
//! The provider exchange ends with a [`ProviderProfile`] whose email the
//! provider has verified. Everything after that point is provider-agnostic.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use reqwest::Client;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use notekeeper_core::ProviderProfile;

use crate::error::{AuthError, AuthResult};

/// Provider tag stored in `Credential::Federated` for Google accounts.
pub const GOOGLE_PROVIDER: &str = "google";

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const SCOPES: &str = "openid email profile";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// An OAuth-style identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Tag recorded on federated identities created through this provider.
    fn tag(&self) -> &str;

    /// URL of the consent screen, carrying the anti-forgery `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Redeem an authorization code for the user's verified profile.
    async fn exchange(&self, code: &str) -> AuthResult<ProviderProfile>;
}

/// Random value for the OAuth `state` parameter.
pub fn new_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare the `state` echoed by the provider against the one issued at
/// login start, in constant time.
pub fn state_matches(expected: &str, returned: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(returned.as_bytes()))
}

/// Google OAuth client configuration.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

impl GoogleConfig {
    /// Configuration against Google's production endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
            redirect_url: redirect_url.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Point all three endpoints at another base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.auth_url = format!("{}/o/oauth2/v2/auth", base);
        self.token_url = format!("{}/token", base);
        self.userinfo_url = format!("{}/v1/userinfo", base);
        self
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

/// Google implementation of [`IdentityProvider`].
pub struct GoogleProvider {
    config: GoogleConfig,
    client: Client,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Provider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    async fn fetch_access_token(&self, code: &str) -> AuthResult<Zeroizing<String>> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(
                subsystem = "auth",
                component = "provider",
                provider = GOOGLE_PROVIDER,
                op = "token",
                status = status.as_u16(),
                "Token exchange rejected"
            );
            return Err(AuthError::Provider(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("Failed to parse token response: {}", e)))?;
        Ok(Zeroizing::new(token.access_token))
    }

    async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<UserInfo> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "Userinfo endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("Failed to parse userinfo: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn tag(&self) -> &str {
        GOOGLE_PROVIDER
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn exchange(&self, code: &str) -> AuthResult<ProviderProfile> {
        let access_token = self.fetch_access_token(code).await?;
        let info = self.fetch_userinfo(&access_token).await?;

        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AuthError::Provider("Profile has no email".to_string()))?;
        if info.email_verified == Some(false) {
            return Err(AuthError::Provider("Profile email is not verified".to_string()));
        }

        debug!(
            subsystem = "auth",
            component = "provider",
            provider = GOOGLE_PROVIDER,
            op = "exchange",
            "Provider profile received"
        );
        Ok(ProviderProfile {
            provider: GOOGLE_PROVIDER.to_string(),
            subject: info.sub,
            email,
            name: info.name,
        })
    }
}
