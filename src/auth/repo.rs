use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{RevokedToken, User};

/// Persistence for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by (normalized) email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Insert a new user. Returns `None` when the email is already taken.
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>>;
}

/// Persistence for the token blacklist.
#[async_trait]
pub trait RevocationRepository: Send + Sync {
    /// Record `jti` as revoked. Re-revoking is a no-op.
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<()>;

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool>;

    /// Drop entries whose token would have expired before `now`.
    async fn prune_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64>;
}

pub type UserRepositoryPtr = Arc<dyn UserRepository>;
pub type RevocationRepositoryPtr = Arc<dyn RevocationRepository>;

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        // The unique index on email decides races between concurrent registrations.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[derive(Clone)]
pub struct PgRevocationRepository {
    db: PgPool,
}

impl PgRevocationRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RevocationRepository for PgRevocationRepository {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let row = sqlx::query_as::<_, RevokedToken>(
            r#"
            SELECT jti, revoked_at, expires_at
            FROM revoked_tokens
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.is_some())
    }

    async fn prune_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let res = sqlx::query(r#"DELETE FROM revoked_tokens WHERE expires_at < $1"#)
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
