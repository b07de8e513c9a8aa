use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

/// User record in the database.
///
/// `verification_token` is set only while the account is unverified and a
/// token has been issued but not yet consumed; `token_expiry` always
/// accompanies it. Verification clears both, permanently.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub verified: bool,
    pub verification_token: Option<String>,
    pub token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Fields the auth service supplies when creating an account; the store
/// assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub verification_token: Option<String>,
    pub token_expiry: Option<OffsetDateTime>,
}

/// Session record binding an opaque bearer id to a user for a bounded
/// time window.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

/// Persistence of user records.
///
/// The unique index on `email` is the authoritative guard against
/// concurrent duplicate registration; `create` reports it as
/// `StoreError::UniqueViolation`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_verification_token(&self, token: &str)
        -> Result<Option<User>, StoreError>;

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Flip `verified` and clear the token in one statement. Returns `false`
    /// when no row had a pending token for this user, which is how a second
    /// redemption of the same token loses the race.
    async fn mark_verified(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Persistence of session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), StoreError>;

    /// Fetch a session only if it is still alive at `now`. Expired rows are
    /// filtered inside the lookup itself, never as a separate check.
    async fn find_active(
        &self,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError>;

    /// Idempotent: deleting an absent session is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
