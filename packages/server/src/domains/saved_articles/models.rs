use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::{NewsArticle, SavedArticle};
use sqlx::PgPool;

use crate::common::{ArticleId, SavedArticleId, UserId};

/// Row in `saved_articles`, unique per (user, article).
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SavedArticleRecord {
    pub id: SavedArticleId,
    pub user_id: UserId,
    pub article_id: ArticleId,
    pub is_read: bool,
    pub saved_at: DateTime<Utc>,
}

impl SavedArticleRecord {
    /// Newest first.
    pub async fn find_for_user(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM saved_articles WHERE user_id = $1 ORDER BY saved_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find(user_id: UserId, article_id: ArticleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM saved_articles WHERE user_id = $1 AND article_id = $2",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// `None` if the article was already saved by this user.
    pub async fn create(user_id: UserId, article_id: ArticleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO saved_articles (id, user_id, article_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, article_id) DO NOTHING
             RETURNING *",
        )
        .bind(SavedArticleId::new())
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(user_id: UserId, article_id: ArticleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "DELETE FROM saved_articles WHERE user_id = $1 AND article_id = $2 RETURNING *",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Scoped to the owner so one user cannot touch another's rows.
    pub async fn set_read(
        id: SavedArticleId,
        user_id: UserId,
        is_read: bool,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE saved_articles SET is_read = $3
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(is_read)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub fn to_saved(&self, article: Option<NewsArticle>) -> SavedArticle {
        SavedArticle {
            id: self.id.into_uuid(),
            user_id: self.user_id.into_uuid(),
            article_id: self.article_id.into_uuid(),
            is_read: self.is_read,
            saved_at: self.saved_at,
            article,
        }
    }
}
