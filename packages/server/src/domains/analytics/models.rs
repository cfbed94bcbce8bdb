use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::{AnalyticsEvent, ArticleStats, EventType, TopArticle};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::{AnalyticsEventId, ArticleId, UserId};

/// Row in `article_analytics`.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AnalyticsEventRecord {
    pub id: AnalyticsEventId,
    pub article_id: ArticleId,
    pub user_id: Option<UserId>,
    pub event_type: EventType,
    pub metadata: Option<Json<serde_json::Value>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TopArticleRow {
    id: ArticleId,
    title: String,
    view_count: i32,
}

impl AnalyticsEventRecord {
    pub async fn create(
        article_id: ArticleId,
        user_id: Option<UserId>,
        event_type: EventType,
        metadata: Option<serde_json::Value>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO article_analytics (id, article_id, user_id, event_type, metadata)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(AnalyticsEventId::new())
        .bind(article_id)
        .bind(user_id)
        .bind(event_type)
        .bind(metadata.map(Json))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Counts per event type for one article.
    pub async fn stats_for(article_id: ArticleId, pool: &PgPool) -> Result<ArticleStats> {
        let (views, shares, saves): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                COUNT(*) FILTER (WHERE event_type = 'view'),
                COUNT(*) FILTER (WHERE event_type = 'share'),
                COUNT(*) FILTER (WHERE event_type = 'save')
             FROM article_analytics
             WHERE article_id = $1",
        )
        .bind(article_id)
        .fetch_one(pool)
        .await?;

        Ok(ArticleStats {
            article_id: article_id.into_uuid(),
            views,
            shares,
            saves,
        })
    }

    /// Articles with the highest view counts.
    pub async fn top_articles(limit: i64, pool: &PgPool) -> Result<Vec<TopArticle>> {
        let rows = sqlx::query_as::<_, TopArticleRow>(
            "SELECT id, title, view_count FROM news
             ORDER BY view_count DESC, created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopArticle {
                article_id: row.id.into_uuid(),
                title: row.title,
                view_count: row.view_count,
            })
            .collect())
    }

    pub fn to_event(&self) -> AnalyticsEvent {
        AnalyticsEvent {
            id: self.id.into_uuid(),
            article_id: self.article_id.into_uuid(),
            user_id: self.user_id.map(UserId::into_uuid),
            event_type: self.event_type,
            metadata: self.metadata.as_ref().map(|json| json.0.clone()),
            timestamp: self.timestamp,
        }
    }
}
