use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use tracing::debug;

use crate::auth::session::SESSION_COOKIE;
use crate::auth::store::User;
use crate::error::AuthError;
use crate::state::AppState;

/// Identity attached to a request by the authentication gate.
///
/// Handlers taking this extractor never run for unauthenticated requests;
/// the rejection is a 401 before the handler body is entered.
pub struct CurrentUser {
    pub user: User,
    /// Raw session id, exposed so logout can invalidate it.
    pub session_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or(AuthError::SessionNotFound)?;

        let user = state.sessions.resolve(&session_id).await.map_err(|e| {
            debug!("session cookie did not resolve");
            e
        })?;

        Ok(CurrentUser { user, session_id })
    }
}
