use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::Role;
use sqlx::{PgExecutor, PgPool};

use crate::common::{UserId, UserRoleId};

/// Row in `user_roles`. At most one per user; absence means `user`.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRoleRecord {
    pub id: UserRoleId,
    pub user_id: UserId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRoleRecord {
    pub async fn create<'e>(
        user_id: UserId,
        role: Role,
        executor: impl PgExecutor<'e>,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO user_roles (id, user_id, role)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(UserRoleId::new())
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Effective role: `user` when no row exists.
    pub async fn role_for(user_id: UserId, pool: &PgPool) -> Result<Role> {
        Ok(Self::find_by_user(user_id, pool)
            .await?
            .map(|record| record.role)
            .unwrap_or_default())
    }

    pub async fn upsert(user_id: UserId, role: Role, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO user_roles (id, user_id, role)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role
             RETURNING *",
        )
        .bind(UserRoleId::new())
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
