use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::{Category, CategoryInput};
use sqlx::PgPool;

use crate::common::CategoryId;

/// Row in `categories`; `article_count` is computed on read.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub article_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

const SELECT_WITH_COUNT: &str = "SELECT c.id, c.name, c.description, c.is_active,
        (SELECT COUNT(*)::int FROM news n WHERE n.category_id = c.id) AS article_count,
        c.created_at
     FROM categories c";

impl CategoryRecord {
    /// All categories ordered by name.
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!("{} ORDER BY c.name", SELECT_WITH_COUNT))
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_id(id: CategoryId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!("{} WHERE c.id = $1", SELECT_WITH_COUNT))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// `None` when the name is taken.
    pub async fn create(input: &CategoryInput, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO categories (id, name, description, is_active, article_count)
             VALUES ($1, $2, $3, $4, 0)
             ON CONFLICT (name) DO NOTHING
             RETURNING *",
        )
        .bind(CategoryId::new())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.is_active.unwrap_or(true))
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update(
        id: CategoryId,
        input: &CategoryInput,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE categories
             SET name = $2,
                 description = $3,
                 is_active = COALESCE($4, is_active)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.is_active)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Articles in the category keep existing with no category.
    pub async fn delete(id: CategoryId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub fn to_category(&self) -> Category {
        Category {
            id: self.id.into_uuid(),
            name: self.name.clone(),
            description: self.description.clone(),
            is_active: self.is_active,
            article_count: self.article_count,
            created_at: self.created_at,
        }
    }
}
