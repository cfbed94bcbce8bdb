use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::{Audience, Notification, NotificationType};
use sqlx::PgPool;

use crate::common::{NotificationId, Page, UserId};

/// Row in `notifications`.
///
/// `sent_at` set means delivered (or claimed for delivery); a row with only
/// `scheduled_for` is pending.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub target_audience: String,
    #[sqlx(rename = "type")]
    pub notification_type: NotificationType,
    pub user_id: Option<UserId>,
    pub link_to_article: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a notification row.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub notification_type: NotificationType,
    pub user_id: Option<UserId>,
    pub link_to_article: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub idempotency_key: Option<String>,
}

impl NotificationRecord {
    /// `None` when the idempotency key was already used.
    pub async fn create(new: &NewNotification, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO notifications (
                id, title, body, audience, target_audience, type, user_id,
                link_to_article, scheduled_for, sent_at, created_by, idempotency_key
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (idempotency_key) DO NOTHING
             RETURNING *",
        )
        .bind(NotificationId::new())
        .bind(new.title.trim())
        .bind(new.body.trim())
        .bind(new.audience)
        .bind(new.audience.as_str())
        .bind(new.notification_type)
        .bind(new.user_id)
        .bind(&new.link_to_article)
        .bind(new.scheduled_for)
        .bind(new.sent_at)
        .bind(new.created_by)
        .bind(&new.idempotency_key)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: NotificationId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_idempotency_key(key: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM notifications WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Most recently sent first.
    pub async fn find_sent(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM notifications
             WHERE sent_at IS NOT NULL
             ORDER BY sent_at DESC",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Pending rows, soonest first.
    pub async fn find_scheduled(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM notifications
             WHERE sent_at IS NULL AND scheduled_for IS NOT NULL
             ORDER BY scheduled_for ASC",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Pending rows whose time has come, oldest schedule first.
    pub async fn find_due(now: DateTime<Utc>, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM notifications
             WHERE sent_at IS NULL AND scheduled_for <= $1
             ORDER BY scheduled_for ASC",
        )
        .bind(now)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Mark a pending row as sent. Only one caller wins for a given row.
    pub async fn claim(id: NotificationId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE notifications SET sent_at = NOW()
             WHERE id = $1 AND sent_at IS NULL
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Delivered notifications visible to a user: broadcasts plus their own.
    pub async fn find_feed(user_id: UserId, page: Page, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM notifications
             WHERE sent_at IS NOT NULL AND (user_id IS NULL OR user_id = $1)
             ORDER BY sent_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn count_feed(user_id: UserId, pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications
             WHERE sent_at IS NOT NULL AND (user_id IS NULL OR user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Delete a row that has not been sent yet.
    pub async fn delete_unsent(id: NotificationId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "DELETE FROM notifications WHERE id = $1 AND sent_at IS NULL RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_read(id: NotificationId, user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE notifications SET is_read = TRUE
             WHERE id = $1 AND (user_id IS NULL OR user_id = $2)
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub fn to_notification(&self) -> Notification {
        Notification {
            id: self.id.into_uuid(),
            title: self.title.clone(),
            body: self.body.clone(),
            audience: self.audience,
            target_audience: self.target_audience.clone(),
            notification_type: self.notification_type,
            user_id: self.user_id.map(UserId::into_uuid),
            link_to_article: self.link_to_article.clone(),
            scheduled_for: self.scheduled_for,
            sent_at: self.sent_at,
            is_read: self.is_read,
            created_by: self.created_by.map(UserId::into_uuid),
            created_at: self.created_at,
        }
    }
}
