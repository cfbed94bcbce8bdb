use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::{NewsArticle, NewsArticleInput, NewsStatus};
use sqlx::PgPool;

use crate::common::{ArticleId, CategoryId, UserId};

/// Row in `news`.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ArticleRecord {
    pub id: ArticleId,
    pub title: String,
    pub summary: String,
    pub content: Option<String>,
    pub image_path: Option<String>,
    pub source_url: Option<String>,
    pub source_name: Option<String>,
    pub source_icon: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: NewsStatus,
    pub created_by: Option<UserId>,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List filters; `None` means no constraint.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub status: Option<NewsStatus>,
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring over title and summary
    pub search: Option<String>,
}

impl ArticleRecord {
    pub async fn find_by_id(id: ArticleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM news WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Newest first.
    pub async fn find_filtered(filter: &ArticleFilter, pool: &PgPool) -> Result<Vec<Self>> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        sqlx::query_as::<_, Self>(
            "SELECT * FROM news
             WHERE ($1::news_status IS NULL OR status = $1)
               AND ($2::uuid IS NULL OR category_id = $2)
               AND ($3::text IS NULL OR title ILIKE $3 OR summary ILIKE $3)
             ORDER BY created_at DESC",
        )
        .bind(filter.status)
        .bind(filter.category_id)
        .bind(pattern)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_ids(ids: &[ArticleId], pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM news WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_idempotency_key(key: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM news WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert an article. With an idempotency key that was already used the
    /// insert is skipped and `None` is returned.
    pub async fn create(
        input: &NewsArticleInput,
        created_by: UserId,
        idempotency_key: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO news (
                id, title, summary, content, image_path, source_url, source_name,
                category_id, status, created_by, idempotency_key
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (idempotency_key) DO NOTHING
             RETURNING *",
        )
        .bind(ArticleId::new())
        .bind(input.title.trim())
        .bind(input.summary.trim())
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(input.source_url.trim())
        .bind(&input.source_name)
        .bind(input.category_id.map(CategoryId::from_uuid))
        .bind(input.status)
        .bind(created_by)
        .bind(idempotency_key)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update(
        id: ArticleId,
        input: &NewsArticleInput,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE news
             SET title = $2,
                 summary = $3,
                 content = $4,
                 image_path = $5,
                 source_url = $6,
                 source_name = $7,
                 category_id = $8,
                 status = $9,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(input.summary.trim())
        .bind(&input.content)
        .bind(&input.image_url)
        .bind(input.source_url.trim())
        .bind(&input.source_name)
        .bind(input.category_id.map(CategoryId::from_uuid))
        .bind(input.status)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Delete and return the removed row.
    pub async fn delete(id: ArticleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("DELETE FROM news WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn increment_view_count(id: ArticleId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE news SET view_count = view_count + 1 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub fn to_article(&self) -> NewsArticle {
        NewsArticle {
            id: self.id.into_uuid(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            content: self.content.clone(),
            image_path: self.image_path.clone(),
            source_url: self.source_url.clone(),
            source_name: self.source_name.clone(),
            source_icon: self.source_icon.clone(),
            category_id: self.category_id.map(CategoryId::into_uuid),
            status: self.status,
            created_by: self.created_by.map(UserId::into_uuid),
            view_count: self.view_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("visa"), "%visa%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
