//! Session cookies and the per-request access extractor.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use tracing::field::display;
use tracing::Span;

use notekeeper_auth::AccessState;
use notekeeper_core::logging::IDENTITY_ID;

use crate::error::ServiceError;
use crate::state::AppState;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "notekeeper_session";

/// Cookie carrying the OAuth `state` between the redirect and the callback.
pub const OAUTH_STATE_COOKIE: &str = "notekeeper_oauth_state";

const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

/// Value of the named cookie, if the request carries it.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(s) = value.to_str() else {
            continue;
        };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

/// Session token from the session cookie, or from a Bearer
/// `Authorization` header for non-browser clients.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = parse_cookie(headers, SESSION_COOKIE) {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    cookie(SESSION_COOKIE, token, max_age_secs, secure)
}

pub fn clear_session_cookie(secure: bool) -> String {
    cookie(SESSION_COOKIE, "", 0, secure)
}

pub fn oauth_state_cookie(state: &str, secure: bool) -> String {
    cookie(OAUTH_STATE_COOKIE, state, OAUTH_STATE_MAX_AGE_SECS, secure)
}

pub fn clear_oauth_state_cookie(secure: bool) -> String {
    cookie(OAUTH_STATE_COOKIE, "", 0, secure)
}

/// Access state of the current request.
///
/// Extraction never refuses an anonymous request; protected operations
/// call [`AccessState::require`] themselves. Only a store failure while
/// resolving the session rejects the request.
#[derive(Debug, Clone)]
pub struct Access(pub AccessState);

#[axum::async_trait]
impl FromRequestParts<AppState> for Access {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers);
        let access = state.accounts.access(token.as_deref()).await?;

        if let Some(identity) = access.identity() {
            Span::current().record(IDENTITY_ID, display(identity.id));
        }
        Ok(Access(access))
    }
}
