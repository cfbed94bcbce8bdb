use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::User;
use sqlx::{PgExecutor, PgPool};

use crate::common::UserId;

/// Row in `users`. The password hash never leaves this module's callers.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Emails compare case-insensitively; they are stored lowercased.
    pub async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert a new account. `None` when the email is already registered.
    pub async fn create<'e>(
        email: &str,
        password_hash: &str,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (id, email, password_hash)
             VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING
             RETURNING *",
        )
        .bind(UserId::new())
        .bind(email.to_lowercase())
        .bind(password_hash)
        .fetch_optional(executor)
        .await
        .map_err(Into::into)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.into_uuid(),
            email: self.email.clone(),
        }
    }
}
