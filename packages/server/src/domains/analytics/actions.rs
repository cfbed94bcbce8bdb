//! Analytics actions

use newsdesk_shared::{AnalyticsEvent, AnalyticsEventInput, ArticleStats, EventType, TopArticle};
use tracing::debug;

use crate::common::{Actor, ApiError, ApiResult, ArticleId, Capability, UserId};
use crate::domains::analytics::models::AnalyticsEventRecord;
use crate::domains::news::models::ArticleRecord;
use crate::kernel::ServerDeps;

pub const DEFAULT_TOP_ARTICLES: i64 = 10;

/// Record an engagement event. Views also bump the article's view count.
pub async fn record_event(
    user_id: UserId,
    input: AnalyticsEventInput,
    deps: &ServerDeps,
) -> ApiResult<AnalyticsEvent> {
    let article_id = ArticleId::from_uuid(input.article_id);
    if ArticleRecord::find_by_id(article_id, &deps.db_pool).await?.is_none() {
        return Err(ApiError::NotFound("Article"));
    }

    let record = AnalyticsEventRecord::create(
        article_id,
        Some(user_id),
        input.event_type,
        input.metadata,
        &deps.db_pool,
    )
    .await?;

    if input.event_type == EventType::View {
        ArticleRecord::increment_view_count(article_id, &deps.db_pool).await?;
    }

    debug!(article_id = %article_id, event = ?input.event_type, "analytics event recorded");
    Ok(record.to_event())
}

pub async fn article_stats(
    actor: Actor,
    article_id: ArticleId,
    deps: &ServerDeps,
) -> ApiResult<ArticleStats> {
    actor.can(Capability::ViewAnalytics).check()?;
    Ok(AnalyticsEventRecord::stats_for(article_id, &deps.db_pool).await?)
}

pub async fn top_articles(
    actor: Actor,
    limit: Option<i64>,
    deps: &ServerDeps,
) -> ApiResult<Vec<TopArticle>> {
    actor.can(Capability::ViewAnalytics).check()?;
    let limit = limit.unwrap_or(DEFAULT_TOP_ARTICLES).clamp(1, 100);
    Ok(AnalyticsEventRecord::top_articles(limit, &deps.db_pool).await?)
}
