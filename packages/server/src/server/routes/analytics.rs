use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use newsdesk_shared::{AnalyticsEvent, AnalyticsEventInput, ArticleStats, TopArticle};
use serde::Deserialize;

use crate::common::{ApiResult, ArticleId};
use crate::domains::analytics::actions;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/api/analytics/events", post(record_event))
        .route("/api/analytics/articles/:id", get(article_stats))
        .route("/api/analytics/top", get(top_articles))
}

async fn record_event(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(input): Json<AnalyticsEventInput>,
) -> ApiResult<(StatusCode, Json<AnalyticsEvent>)> {
    let event = actions::record_event(user.user_id, input, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn article_stats(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<ArticleId>,
) -> ApiResult<Json<ArticleStats>> {
    let actor = user.actor(&state.deps).await?;
    Ok(Json(actions::article_stats(actor, id, &state.deps).await?))
}

#[derive(Deserialize)]
struct TopQuery {
    limit: Option<i64>,
}

async fn top_articles(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Query(query): Query<TopQuery>,
) -> ApiResult<Json<Vec<TopArticle>>> {
    let actor = user.actor(&state.deps).await?;
    Ok(Json(
        actions::top_articles(actor, query.limit, &state.deps).await?,
    ))
}
