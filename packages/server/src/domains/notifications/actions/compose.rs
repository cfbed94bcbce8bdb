//! Compose action: send now or schedule for later

use std::collections::BTreeMap;

use chrono::Utc;
use newsdesk_shared::{
    realtime::topics, validate_notification_draft, Audience, ChangeEvent, Notification,
    NotificationDraft,
};
use tracing::{info, warn};

use crate::common::{Actor, ApiError, ApiResult, Capability, UserId};
use crate::domains::notifications::actions::deliver;
use crate::domains::notifications::models::{NewNotification, NotificationRecord};
use crate::kernel::ServerDeps;

/// Store a composed notification.
///
/// Immediate drafts are stored sent (`sent_at` set, `scheduled_for` null)
/// and pushed right away when their type includes mobile. Scheduled drafts
/// are stored pending (`sent_at` null, `scheduled_for` set) for the
/// scheduler to pick up. A `both` notification is a single row.
pub async fn compose_notification(
    actor: Actor,
    draft: NotificationDraft,
    idempotency_key: Option<String>,
    deps: &ServerDeps,
) -> ApiResult<Notification> {
    let actor = actor.can(Capability::ManageNotifications).check()?;

    let now = Utc::now();
    validate_notification_draft(&draft, now)
        .into_result()
        .map_err(ApiError::invalid_form)?;

    let (scheduled_for, sent_at) = if draft.schedule_later {
        (draft.scheduled_time, None)
    } else {
        (None, Some(now))
    };
    let user_id = match draft.audience {
        Audience::Individual => draft.user_id.map(UserId::from_uuid),
        _ => None,
    };

    let new = NewNotification {
        title: draft.title,
        body: draft.body,
        audience: draft.audience,
        notification_type: draft.notification_type,
        user_id,
        link_to_article: draft.link_to_article.filter(|link| !link.trim().is_empty()),
        scheduled_for,
        sent_at,
        created_by: Some(actor.user_id()),
        idempotency_key: idempotency_key.clone(),
    };

    let Some(record) = NotificationRecord::create(&new, &deps.db_pool).await? else {
        info!(idempotency_key = ?idempotency_key, "duplicate notification compose");
        let existing = match idempotency_key.as_deref() {
            Some(key) => NotificationRecord::find_by_idempotency_key(key, &deps.db_pool).await?,
            None => None,
        };
        return existing
            .map(|record| record.to_notification())
            .ok_or_else(|| ApiError::Conflict("Notification already exists".to_string()));
    };

    deps.stream_hub
        .publish_change(
            topics::NOTIFICATIONS,
            &ChangeEvent::insert("notifications", record.id.into_uuid(), record.to_notification()),
        )
        .await;

    if record.sent_at.is_some() && record.notification_type.is_push() {
        // The row stays sent even if the gateway fails; the failure is logged.
        if let Err(e) = deliver(&record, BTreeMap::new(), deps).await {
            warn!(notification_id = %record.id, error = %e, "immediate push failed");
        }
    }

    info!(
        notification_id = %record.id,
        scheduled = record.scheduled_for.is_some(),
        audience = record.audience.as_str(),
        "notification composed"
    );
    Ok(record.to_notification())
}
