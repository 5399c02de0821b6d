//! Registration, login and logout HTTP handlers.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use zeroize::Zeroizing;

use notekeeper_auth::{new_state, state_matches};
use notekeeper_core::Identity;

use crate::error::ServiceError;
use crate::extract::{
    clear_oauth_state_cookie, clear_session_cookie, oauth_state_cookie, parse_cookie,
    session_cookie, session_token, Access, OAUTH_STATE_COOKIE,
};
use crate::state::AppState;

/// Email and password as submitted by the client.
#[derive(Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

/// Public view of an identity. Never carries credential data.
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub id: Uuid,
    pub email: String,
    pub login_method: String,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            login_method: identity.credential.login_method().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

async fn signed_in(
    state: &AppState,
    identity: &Identity,
) -> Result<[(header::HeaderName, String); 1], ServiceError> {
    let token = state.accounts.start_session(identity).await?;
    Ok([(
        header::SET_COOKIE,
        session_cookie(
            token.as_str(),
            state.accounts.session_ttl_secs(),
            state.cookie_secure,
        ),
    )])
}

/// Register a local-password account and sign it in.
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let CredentialsBody { email, password } = req;
    let identity = state
        .accounts
        .register_local(&email, Zeroizing::new(password))
        .await?;
    let cookie = signed_in(&state, &identity).await?;
    Ok((
        StatusCode::CREATED,
        cookie,
        Json(IdentityResponse::from(&identity)),
    ))
}

/// Log in with email and password.
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ServiceError> {
    let CredentialsBody { email, password } = req;
    let identity = state
        .accounts
        .login_local(&email, Zeroizing::new(password))
        .await?;
    let cookie = signed_in(&state, &identity).await?;
    Ok((cookie, Json(IdentityResponse::from(&identity))))
}

/// Invalidate the current session, if any.
///
/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let token = session_token(&headers);
    state.accounts.logout(token.as_deref()).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(state.cookie_secure))],
    ))
}

/// The identity behind the current session.
///
/// GET /auth/me
pub async fn me(Access(access): Access) -> Result<Json<IdentityResponse>, ServiceError> {
    let identity = access.require()?;
    Ok(Json(IdentityResponse::from(identity)))
}

/// Start a Google login.
///
/// GET /auth/google
pub async fn google_start(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let provider = state.google.as_ref().ok_or(ServiceError::NotFoundOrNotOwned)?;
    let oauth_state = new_state();
    let url = provider.authorization_url(&oauth_state);
    Ok((
        [(
            header::SET_COOKIE,
            oauth_state_cookie(&oauth_state, state.cookie_secure),
        )],
        Redirect::to(&url),
    ))
}

/// Finish a Google login and sign the resolved identity in.
///
/// GET /auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let provider = state.google.as_ref().ok_or(ServiceError::NotFoundOrNotOwned)?;

    if let Some(error) = params.error.as_deref() {
        warn!(
            subsystem = "api",
            component = "auth",
            op = "oauth_callback",
            provider = provider.tag(),
            error,
            "Provider returned an error"
        );
        return Err(ServiceError::AuthenticationFailure);
    }

    let expected = parse_cookie(&headers, OAUTH_STATE_COOKIE);
    let state_ok = matches!(
        (expected.as_deref(), params.state.as_deref()),
        (Some(cookie), Some(returned)) if state_matches(cookie, returned)
    );
    if !state_ok {
        warn!(
            subsystem = "api",
            component = "auth",
            op = "oauth_callback",
            provider = provider.tag(),
            "OAuth state mismatch"
        );
        return Err(ServiceError::AuthenticationFailure);
    }

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(ServiceError::AuthenticationFailure)?;

    let profile = provider.exchange(code).await?;
    let identity = state.accounts.login_federated(&profile).await?;
    let token = state.accounts.start_session(&identity).await?;

    Ok((
        AppendHeaders([
            (
                header::SET_COOKIE,
                session_cookie(
                    token.as_str(),
                    state.accounts.session_ttl_secs(),
                    state.cookie_secure,
                ),
            ),
            (
                header::SET_COOKIE,
                clear_oauth_state_cookie(state.cookie_secure),
            ),
        ]),
        Redirect::to(&state.post_login_redirect),
    ))
}
