//! In-memory stores, substituted for Postgres in tests and used by
//! `AppState::fake()`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::store::{NewUser, Session, SessionStore, User, UserStore};
use crate::error::StoreError;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite a user's token expiry, to simulate the passage of time.
    #[cfg(test)]
    pub fn set_token_expiry(&self, email: &str, expiry: OffsetDateTime) {
        let mut users = self.users.lock().unwrap();
        let user = users
            .values_mut()
            .find(|u| u.email == email)
            .expect("no such user");
        user.token_expiry = Some(expiry);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::UniqueViolation);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            verified: new_user.verified,
            verification_token: new_user.verification_token,
            token_expiry: new_user.token_expiry,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn mark_verified(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) if !user.verified && user.verification_token.is_some() => {
                user.verified = true;
                user.verification_token = None;
                user.token_expiry = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_active(
        &self,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .get(id)
            .filter(|s| s.expires_at > now)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(id);
        Ok(())
    }
}
