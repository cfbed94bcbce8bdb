//! Notification composition, admin lists and the signed-in user's feed.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use newsdesk_shared::{Notification, NotificationDraft, NotificationPage};
use serde::Deserialize;

use crate::common::pagination::PageQuery;
use crate::common::{ApiResult, NotificationId, Page};
use crate::domains::notifications::actions;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;
use crate::server::routes::idempotency_key;

pub fn router() -> Router {
    Router::new()
        .route("/api/notifications", get(list).post(compose))
        .route("/api/notifications/feed", get(feed))
        .route("/api/notifications/:id", delete(cancel))
        .route("/api/notifications/:id/read", post(mark_read))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ListStatus {
    #[default]
    Sent,
    Scheduled,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: ListStatus,
}

async fn list(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let actor = user.actor(&state.deps).await?;
    let notifications = match query.status {
        ListStatus::Sent => actions::list_sent(actor, &state.deps).await?,
        ListStatus::Scheduled => actions::list_scheduled(actor, &state.deps).await?,
    };
    Ok(Json(notifications))
}

async fn compose(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    headers: HeaderMap,
    Json(draft): Json<NotificationDraft>,
) -> ApiResult<(StatusCode, Json<Notification>)> {
    let actor = user.actor(&state.deps).await?;
    let notification =
        actions::compose_notification(actor, draft, idempotency_key(&headers), &state.deps)
            .await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn cancel(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<NotificationId>,
) -> ApiResult<StatusCode> {
    let actor = user.actor(&state.deps).await?;
    actions::cancel_scheduled(actor, id, &state.deps).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn feed(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<NotificationPage>> {
    Ok(Json(
        actions::list_feed(user.user_id, Page::from(query), &state.deps).await?,
    ))
}

async fn mark_read(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(actions::mark_read(user.user_id, id, &state.deps).await?))
}
