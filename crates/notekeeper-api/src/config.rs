//! Server configuration from environment variables.

use std::collections::HashMap;

use chrono::Duration;
use notekeeper_auth::{GoogleConfig, DEFAULT_SESSION_TTL_HOURS};
use notekeeper_core::{Error, Result};
use notekeeper_db::pool::DEFAULT_MAX_CONNECTIONS;

/// Longest accepted `SESSION_TTL_HOURS` (one year). Larger values fall back
/// to the default.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Runtime configuration for the API server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub post_login_redirect: String,
    /// Present only when both Google credentials are configured.
    pub google: Option<GoogleConfig>,
}

impl AppConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Build configuration from an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| lookup(&vars, key);

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or("http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        let google = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(id), Some(secret)) => {
                let redirect = get("GOOGLE_REDIRECT_URL")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}/auth/google/callback", public_base_url));
                Some(GoogleConfig::new(id, secret, redirect))
            }
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            database_url: get("DATABASE_URL")
                .unwrap_or("postgres://localhost/notekeeper")
                .to_string(),
            host: get("HOST").unwrap_or("0.0.0.0").to_string(),
            port: get("PORT").and_then(|v| v.parse().ok()).unwrap_or(3000),
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            session_ttl_hours: get("SESSION_TTL_HOURS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0 && *n <= MAX_SESSION_TTL_HOURS)
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS),
            cookie_secure: get("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            post_login_redirect: get("POST_LOGIN_REDIRECT").unwrap_or("/notes").to_string(),
            google,
        })
    }

    /// Session lifetime as a duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::try_hours(self.session_ttl_hours)
            .unwrap_or_else(|| Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}
