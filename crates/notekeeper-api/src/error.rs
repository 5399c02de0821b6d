//! Service error taxonomy and its HTTP mapping.

use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::error;

use notekeeper_auth::{AccessDenied, AuthError};
use notekeeper_core::Error;

/// Where clients are sent when a request needs a session.
pub const LOGIN_PATH: &str = "/auth/login";

const AUTHENTICATION_FAILURE_MESSAGE: &str = "Invalid email or password";

/// Every failure a service operation can report.
///
/// Store and driver errors are converted at the service boundary and never
/// reach a response body.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad credential, unknown email or federated-only account.
    #[error("{}", AUTHENTICATION_FAILURE_MESSAGE)]
    AuthenticationFailure,

    /// No valid session.
    #[error("Authentication required")]
    Unauthenticated,

    /// The note does not exist or belongs to someone else.
    #[error("Not found")]
    NotFoundOrNotOwned,

    #[error("An account with this email already exists")]
    AlreadyExists,

    #[error("{0}")]
    Validation(String),

    #[error("Service temporarily unavailable")]
    StoreUnavailable,
}

impl From<AccessDenied> for ServiceError {
    fn from(_: AccessDenied) -> Self {
        ServiceError::Unauthenticated
    }
}

impl From<Error> for ServiceError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => ServiceError::Validation(msg),
            Error::NotFound(_) => ServiceError::NotFoundOrNotOwned,
            Error::Conflict(_) => ServiceError::AlreadyExists,
            other => {
                error!(
                    subsystem = "api",
                    component = "services",
                    error = %other,
                    "Store operation failed"
                );
                ServiceError::StoreUnavailable
            }
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::IdentityNotFound
            | AuthError::CredentialTypeMismatch
            | AuthError::InvalidCredential => ServiceError::AuthenticationFailure,
            AuthError::AlreadyExists => ServiceError::AlreadyExists,
            AuthError::Provider(msg) => {
                error!(
                    subsystem = "api",
                    component = "services",
                    error = %msg,
                    "Identity provider exchange failed"
                );
                ServiceError::AuthenticationFailure
            }
            AuthError::Hashing(msg) => {
                error!(
                    subsystem = "api",
                    component = "services",
                    error = %msg,
                    "Password hashing failed"
                );
                ServiceError::StoreUnavailable
            }
            AuthError::Store(err) => err.into(),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::AuthenticationFailure | ServiceError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::NotFoundOrNotOwned => StatusCode::NOT_FOUND,
            ServiceError::AlreadyExists => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match &self {
            ServiceError::Unauthenticated => serde_json::json!({
                "error": self.to_string(),
                "login": LOGIN_PATH,
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
