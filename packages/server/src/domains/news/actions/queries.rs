use newsdesk_shared::{NewsArticle, NewsStatus, StatusFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::common::{Actor, ApiError, ApiResult, ArticleId, Capability, CategoryId};
use crate::domains::news::models::{ArticleFilter, ArticleRecord, AuditEntryRecord};
use crate::kernel::ServerDeps;

/// Query string for `GET /api/news`. `category=all` means no category filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListArticlesQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListArticlesQuery {
    fn into_filter(self) -> ApiResult<ArticleFilter> {
        let category_id = match self.category.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map(CategoryId::from_uuid)
                    .map_err(|_| ApiError::bad_request("Invalid category"))?,
            ),
        };
        Ok(ArticleFilter {
            status: self.status.status(),
            category_id,
            search: self.search,
        })
    }
}

/// Admins see every article; everyone else only published ones.
pub async fn list_articles(
    viewer: Actor,
    query: ListArticlesQuery,
    deps: &ServerDeps,
) -> ApiResult<Vec<NewsArticle>> {
    let mut filter = query.into_filter()?;
    if !viewer.is_admin() {
        filter.status = Some(NewsStatus::Published);
    }

    let records = ArticleRecord::find_filtered(&filter, &deps.db_pool).await?;
    Ok(records.iter().map(ArticleRecord::to_article).collect())
}

pub async fn get_article(viewer: Actor, id: ArticleId, deps: &ServerDeps) -> ApiResult<NewsArticle> {
    let record = ArticleRecord::find_by_id(id, &deps.db_pool)
        .await?
        .filter(|article| viewer.is_admin() || article.status == NewsStatus::Published)
        .ok_or(ApiError::NotFound("Article"))?;
    Ok(record.to_article())
}

/// Audit trail for one article, including entries for a deleted one.
pub async fn article_history(
    actor: Actor,
    id: ArticleId,
    deps: &ServerDeps,
) -> ApiResult<Vec<AuditEntryRecord>> {
    actor.can(Capability::ManageNews).check()?;
    Ok(AuditEntryRecord::find_for_article(id, &deps.db_pool).await?)
}
