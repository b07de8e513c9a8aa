use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::store::{NewUser, Session, SessionStore, User, UserStore};
use crate::error::StoreError;

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return StoreError::UniqueViolation;
        }
    }
    StoreError::backend(e)
}

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, verified, verification_token, token_expiry, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, verified, verification_token, token_expiry, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, verified, verification_token, token_expiry, created_at
            FROM users
            WHERE verification_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, verified, verification_token, token_expiry)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, verified, verification_token, token_expiry, created_at
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.verified)
        .bind(&new_user.verification_token)
        .bind(new_user.token_expiry)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn mark_verified(&self, id: Uuid) -> Result<bool, StoreError> {
        // The token-pending predicate keeps a second redemption from
        // re-flipping an already verified row.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET verified = TRUE,
                verification_token = NULL,
                token_expiry = NULL
            WHERE id = $1 AND verified = FALSE AND verification_token IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

/// Postgres-backed session store.
#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(&self.db)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_active(
        &self,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, expires_at
            FROM sessions
            WHERE id = $1 AND expires_at > $2
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
