//! Saved article actions

use std::collections::HashMap;

use newsdesk_shared::{realtime::topics, ChangeEvent, SavedArticle};
use tracing::info;

use crate::common::{ApiError, ApiResult, ArticleId, SavedArticleId, UserId};
use crate::domains::news::models::ArticleRecord;
use crate::domains::saved_articles::models::SavedArticleRecord;
use crate::kernel::ServerDeps;

const TABLE: &str = "saved_articles";

/// The user's saved articles with article details, newest first.
pub async fn list_saved_articles(user_id: UserId, deps: &ServerDeps) -> ApiResult<Vec<SavedArticle>> {
    let saved = SavedArticleRecord::find_for_user(user_id, &deps.db_pool).await?;

    let ids: Vec<ArticleId> = saved.iter().map(|s| s.article_id).collect();
    let articles: HashMap<ArticleId, ArticleRecord> = ArticleRecord::find_by_ids(&ids, &deps.db_pool)
        .await?
        .into_iter()
        .map(|article| (article.id, article))
        .collect();

    Ok(saved
        .iter()
        .map(|s| s.to_saved(articles.get(&s.article_id).map(ArticleRecord::to_article)))
        .collect())
}

/// Save an article. Saving it twice returns the existing entry.
pub async fn save_article(
    user_id: UserId,
    article_id: ArticleId,
    deps: &ServerDeps,
) -> ApiResult<SavedArticle> {
    let article = ArticleRecord::find_by_id(article_id, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Article"))?
        .to_article();

    let record = match SavedArticleRecord::create(user_id, article_id, &deps.db_pool).await? {
        Some(record) => {
            let saved = record.to_saved(Some(article.clone()));
            deps.stream_hub
                .publish_change(
                    &topics::saved_articles(user_id.into_uuid()),
                    &ChangeEvent::insert(TABLE, saved.id, &saved),
                )
                .await;
            info!(user_id = %user_id, article_id = %article_id, "article saved");
            record
        }
        None => SavedArticleRecord::find(user_id, article_id, &deps.db_pool)
            .await?
            .ok_or(ApiError::NotFound("Saved article"))?,
    };

    Ok(record.to_saved(Some(article)))
}

pub async fn unsave_article(user_id: UserId, article_id: ArticleId, deps: &ServerDeps) -> ApiResult<()> {
    let record = SavedArticleRecord::delete(user_id, article_id, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Saved article"))?;

    deps.stream_hub
        .publish_change(
            &topics::saved_articles(user_id.into_uuid()),
            &ChangeEvent::<SavedArticle>::delete(TABLE, record.id.into_uuid()),
        )
        .await;
    Ok(())
}

pub async fn set_read_status(
    user_id: UserId,
    id: SavedArticleId,
    is_read: bool,
    deps: &ServerDeps,
) -> ApiResult<SavedArticle> {
    let record = SavedArticleRecord::set_read(id, user_id, is_read, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Saved article"))?;

    let article = ArticleRecord::find_by_id(record.article_id, &deps.db_pool)
        .await?
        .map(|a| a.to_article());
    let saved = record.to_saved(article);

    deps.stream_hub
        .publish_change(
            &topics::saved_articles(user_id.into_uuid()),
            &ChangeEvent::update(TABLE, saved.id, &saved),
        )
        .await;
    Ok(saved)
}
