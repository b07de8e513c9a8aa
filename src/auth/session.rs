use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::store::{Session, SessionStore, User, UserStore};
use crate::auth::token;
use crate::error::AuthError;

/// Name of the browser cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session_id";

const SHORT_TTL: Duration = Duration::days(1);
const REMEMBER_TTL: Duration = Duration::days(30);

/// Issues, resolves and invalidates sessions.
///
/// Expiry is lazy: expired rows are filtered on lookup, nothing purges
/// them proactively.
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
}

impl SessionManager {
    pub fn new(sessions: Arc<dyn SessionStore>, users: Arc<dyn UserStore>) -> Self {
        Self { sessions, users }
    }

    /// Two-tier duration model: 1 day, or 30 days with remember-me.
    pub fn ttl(remember: bool) -> Duration {
        if remember {
            REMEMBER_TTL
        } else {
            SHORT_TTL
        }
    }

    /// Issue a fresh session for `user_id` and persist it.
    pub async fn create(&self, user_id: Uuid, remember: bool) -> Result<Session, AuthError> {
        let session = Session {
            id: token::generate()?,
            user_id,
            expires_at: OffsetDateTime::now_utc() + Self::ttl(remember),
        };
        self.sessions.insert(&session).await?;
        Ok(session)
    }

    /// Resolve a session id to its user. An expired session is
    /// indistinguishable from an absent one.
    pub async fn resolve(&self, session_id: &str) -> Result<User, AuthError> {
        let session = self
            .sessions
            .find_active(session_id, OffsetDateTime::now_utc())
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        self.users
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }

    /// Delete a session. Idempotent: an already-gone session is fine.
    pub async fn invalidate(&self, session_id: &str) -> Result<(), AuthError> {
        self.sessions.delete(session_id).await?;
        Ok(())
    }
}

/// Cookie carrying a freshly created session, Max-Age matched to its
/// duration class.
pub fn session_cookie(session: &Session, remember: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.id.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(SessionManager::ttl(remember))
        .build()
}

/// Max-Age=0 cookie, the client-side half of logout.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::ZERO)
        .build()
}
