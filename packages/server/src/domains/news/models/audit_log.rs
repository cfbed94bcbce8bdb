use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::{ArticleId, AuditEntryId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

/// Row in `news_audit_log`. Entries outlive the article they describe.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct AuditEntryRecord {
    pub id: AuditEntryId,
    pub news_id: ArticleId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub changes: Option<Json<serde_json::Value>>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntryRecord {
    pub async fn record(
        news_id: ArticleId,
        user_id: UserId,
        action: AuditAction,
        changes: serde_json::Value,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO news_audit_log (id, news_id, user_id, action, changes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(AuditEntryId::new())
        .bind(news_id)
        .bind(user_id)
        .bind(action.as_str())
        .bind(Json(changes))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Oldest first.
    pub async fn find_for_article(news_id: ArticleId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM news_audit_log WHERE news_id = $1 ORDER BY timestamp, id",
        )
        .bind(news_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
