use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::common::{SessionId, UserId};

/// Row in `auth_sessions`: one per sign-in, addressed by refresh token digest.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AuthSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    pub async fn create(
        user_id: UserId,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO auth_sessions (id, user_id, refresh_token_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(SessionId::new())
        .bind(user_id)
        .bind(refresh_token_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Whether access tokens minted for this session are still honoured.
    pub async fn is_active(id: SessionId, pool: &PgPool) -> Result<bool> {
        let active: Option<bool> = sqlx::query_scalar(
            "SELECT revoked_at IS NULL AND expires_at > NOW()
             FROM auth_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(active.unwrap_or(false))
    }

    /// Swap the refresh token of an active session.
    ///
    /// Matches on the old digest so two concurrent refreshes with the same
    /// token cannot both succeed.
    pub async fn rotate(
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE auth_sessions
             SET refresh_token_hash = $2, expires_at = $3
             WHERE refresh_token_hash = $1
               AND revoked_at IS NULL
               AND expires_at > NOW()
             RETURNING *",
        )
        .bind(old_hash)
        .bind(new_hash)
        .bind(expires_at)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn revoke(id: SessionId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET revoked_at = NOW()
             WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
