//! SSE streaming endpoint.
//!
//! GET /api/streams/:topic?token=JWT
//!
//! EventSource cannot send custom headers, so the access token may be passed
//! as `?token=`; the Authorization header is accepted as a fallback. Each
//! frame carries one JSON value published on the topic's `StreamHub` channel.

use std::convert::Infallible;

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use newsdesk_shared::realtime::topics;
use serde::Deserialize;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::debug;

use crate::common::{Actor, UserId};
use crate::domains::auth::models::AuthSession;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

#[derive(Deserialize)]
pub struct StreamQuery {
    token: Option<String>,
}

/// SSE stream handler.
///
/// 401 without a valid token for a live session, 403 when the caller may
/// not read the topic.
pub async fn stream_handler(
    Extension(state): Extension<AxumAppState>,
    Path(topic): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let deps = &state.deps;

    let token = query
        .token
        .or_else(|| extract_bearer_token(&headers))
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let user: AuthUser = deps
        .jwt_service
        .verify_token(&token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?
        .into();

    let active = AuthSession::is_active(user.session_id, &deps.db_pool)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !active {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let actor = Actor::load(user.user_id, &deps.db_pool)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !authorize_topic(&topic, &actor) {
        debug!(user_id = %user.user_id, topic = %topic, "stream topic denied");
        return Err(StatusCode::FORBIDDEN);
    }

    let rx = deps.stream_hub.subscribe(&topic).await;

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async {
        match result {
            Ok(value) => {
                let event_name = value
                    .get("kind")
                    .and_then(|t| t.as_str())
                    .unwrap_or("message")
                    .to_string();
                Event::default()
                    .event(event_name)
                    .json_data(&value)
                    .ok()
                    .map(Ok)
            }
            Err(BroadcastStreamRecvError::Lagged(n)) => Event::default()
                .event("lagged")
                .json_data(&serde_json::json!({ "missed": n }))
                .ok()
                .map(Ok),
        }
    });

    Ok(Sse::new(connected.chain(events)).keep_alive(KeepAlive::default()))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Topic-level authorization.
///
/// `news` is open to every signed-in user, `notifications` to admins, and
/// per-user topics only to their owner.
fn authorize_topic(topic: &str, actor: &Actor) -> bool {
    if topic == topics::NEWS {
        return true;
    }
    if topic == topics::NOTIFICATIONS {
        return actor.is_admin();
    }

    let owner = topic
        .strip_prefix("saved_articles:")
        .or_else(|| topic.strip_prefix("auth:"))
        .and_then(|id| UserId::parse(id).ok());
    owner == Some(actor.user_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_shared::Role;

    #[test]
    fn news_is_open_to_everyone() {
        let reader = Actor::new(UserId::new(), Role::User);
        assert!(authorize_topic(topics::NEWS, &reader));
    }

    #[test]
    fn notifications_need_admin() {
        let reader = Actor::new(UserId::new(), Role::User);
        let admin = Actor::new(UserId::new(), Role::Admin);
        assert!(!authorize_topic(topics::NOTIFICATIONS, &reader));
        assert!(authorize_topic(topics::NOTIFICATIONS, &admin));
    }

    #[test]
    fn per_user_topics_only_match_their_owner() {
        let reader = Actor::new(UserId::new(), Role::User);
        let other = UserId::new();

        let own = topics::saved_articles(reader.user_id().into_uuid());
        assert!(authorize_topic(&own, &reader));
        assert!(authorize_topic(&topics::auth(reader.user_id().into_uuid()), &reader));

        let admin = Actor::new(UserId::new(), Role::Admin);
        assert!(!authorize_topic(&topics::saved_articles(other.into_uuid()), &admin));
        assert!(!authorize_topic("chat:whatever", &reader));
        assert!(!authorize_topic("saved_articles:not-a-uuid", &reader));
    }
}
