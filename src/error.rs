use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures a store backend can report.
///
/// `Backend` wraps the underlying driver error opaquely so that storage
/// details never travel past this boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("storage backend error")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(anyhow::Error::new(err))
    }
}

/// Everything the auth core can fail with.
///
/// Variants up to `SessionNotFound` are expected, caller-recoverable
/// outcomes; the rest are infrastructure failures surfaced as a generic 500.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email not verified")]
    EmailUnverified,
    #[error("invalid or expired verification token")]
    InvalidToken,
    #[error("session not found")]
    SessionNotFound,
    #[error("password hashing failed")]
    Hashing(#[source] anyhow::Error),
    #[error("secure randomness unavailable")]
    EntropyUnavailable(#[source] rand::Error),
    #[error("storage error")]
    Store(#[from] StoreError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // User-visible messages stay generic: wrong password, unknown email
        // and (by default) unverified accounts all render the same text, and
        // token failures never say whether the token was absent, expired or
        // already consumed.
        let (status, message) = match &self {
            AuthError::Validation(message) => (StatusCode::BAD_REQUEST, *message),
            AuthError::EmailTaken => (StatusCode::CONFLICT, "Email already registered"),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            AuthError::EmailUnverified => (StatusCode::FORBIDDEN, "Email not verified"),
            AuthError::InvalidToken => {
                (StatusCode::BAD_REQUEST, "Invalid or expired verification link")
            }
            AuthError::SessionNotFound => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            AuthError::Hashing(e) => {
                error!(error = %e, "password hashing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
            AuthError::EntropyUnavailable(e) => {
                error!(error = %e, "secure randomness unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
            AuthError::Store(e) => {
                error!(error = %e, "store operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
