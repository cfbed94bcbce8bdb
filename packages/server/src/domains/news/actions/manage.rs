use newsdesk_shared::{realtime::topics, validate_news_form, ChangeEvent, NewsArticle, NewsArticleInput};
use tracing::{info, warn};

use crate::common::{Actor, ApiError, ApiResult, ArticleId, Capability};
use crate::domains::news::actions::managed_image_path;
use crate::domains::news::models::{ArticleRecord, AuditAction, AuditEntryRecord};
use crate::kernel::ServerDeps;

const TABLE: &str = "news";

/// Create an article.
///
/// A repeated call with the same idempotency key returns the article the
/// first call created, without a second audit entry or event.
pub async fn create_article(
    actor: Actor,
    input: NewsArticleInput,
    idempotency_key: Option<String>,
    deps: &ServerDeps,
) -> ApiResult<NewsArticle> {
    let actor = actor.can(Capability::ManageNews).check()?;
    validate_news_form(&input, false)
        .into_result()
        .map_err(ApiError::invalid_form)?;

    let key = idempotency_key.as_deref();
    let Some(record) =
        ArticleRecord::create(&input, actor.user_id(), key, &deps.db_pool).await?
    else {
        let existing = match key {
            Some(key) => ArticleRecord::find_by_idempotency_key(key, &deps.db_pool).await?,
            None => None,
        };
        info!(idempotency_key = ?key, "duplicate article create");
        return existing
            .map(|record| record.to_article())
            .ok_or_else(|| ApiError::Conflict("Article already exists".to_string()));
    };

    audit(&record, actor, AuditAction::Create, serde_json::to_value(&input).ok(), deps).await;

    let article = record.to_article();
    deps.stream_hub
        .publish_change(topics::NEWS, &ChangeEvent::insert(TABLE, article.id, &article))
        .await;

    info!(article_id = %record.id, status = record.status.as_str(), "article created");
    Ok(article)
}

pub async fn update_article(
    actor: Actor,
    id: ArticleId,
    input: NewsArticleInput,
    deps: &ServerDeps,
) -> ApiResult<NewsArticle> {
    let actor = actor.can(Capability::ManageNews).check()?;
    validate_news_form(&input, false)
        .into_result()
        .map_err(ApiError::invalid_form)?;

    let record = ArticleRecord::update(id, &input, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Article"))?;

    audit(&record, actor, AuditAction::Update, serde_json::to_value(&input).ok(), deps).await;

    let article = record.to_article();
    deps.stream_hub
        .publish_change(topics::NEWS, &ChangeEvent::update(TABLE, article.id, &article))
        .await;

    info!(article_id = %id, "article updated");
    Ok(article)
}

/// Delete an article, then best-effort remove its stored image.
///
/// The row deletion is what the caller observes; an image that cannot be
/// removed is logged and left behind.
pub async fn delete_article(actor: Actor, id: ArticleId, deps: &ServerDeps) -> ApiResult<()> {
    let actor = actor.can(Capability::ManageNews).check()?;

    let record = ArticleRecord::delete(id, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Article"))?;

    deps.stream_hub
        .publish_change(
            topics::NEWS,
            &ChangeEvent::<NewsArticle>::delete(TABLE, id.into_uuid()),
        )
        .await;

    audit(
        &record,
        actor,
        AuditAction::Delete,
        Some(serde_json::json!({ "title": record.title })),
        deps,
    )
    .await;

    if let Some(path) = record.image_path.as_deref().and_then(managed_image_path) {
        if let Err(e) = deps.image_storage.remove(&path).await {
            warn!(article_id = %id, path = %path, error = %e, "failed to remove article image");
        }
    }

    info!(article_id = %id, "article deleted");
    Ok(())
}

async fn audit(
    record: &ArticleRecord,
    actor: Actor,
    action: AuditAction,
    changes: Option<serde_json::Value>,
    deps: &ServerDeps,
) {
    let changes = changes.unwrap_or(serde_json::Value::Null);
    if let Err(e) =
        AuditEntryRecord::record(record.id, actor.user_id(), action, changes, &deps.db_pool).await
    {
        warn!(article_id = %record.id, action = action.as_str(), error = %e, "audit write failed");
    }
}
