use newsdesk_shared::{realtime::topics, ChangeEvent, Notification, NotificationPage};
use tracing::info;

use crate::common::{Actor, ApiError, ApiResult, Capability, NotificationId, Page, UserId};
use crate::domains::notifications::models::NotificationRecord;
use crate::kernel::ServerDeps;

pub async fn list_sent(actor: Actor, deps: &ServerDeps) -> ApiResult<Vec<Notification>> {
    actor.can(Capability::ManageNotifications).check()?;
    let records = NotificationRecord::find_sent(&deps.db_pool).await?;
    Ok(records.iter().map(NotificationRecord::to_notification).collect())
}

pub async fn list_scheduled(actor: Actor, deps: &ServerDeps) -> ApiResult<Vec<Notification>> {
    actor.can(Capability::ManageNotifications).check()?;
    let records = NotificationRecord::find_scheduled(&deps.db_pool).await?;
    Ok(records.iter().map(NotificationRecord::to_notification).collect())
}

/// Paginated feed of delivered notifications for the signed-in user.
pub async fn list_feed(user_id: UserId, page: Page, deps: &ServerDeps) -> ApiResult<NotificationPage> {
    let records = NotificationRecord::find_feed(user_id, page, &deps.db_pool).await?;
    let count = NotificationRecord::count_feed(user_id, &deps.db_pool).await?;
    Ok(NotificationPage {
        notifications: records.iter().map(NotificationRecord::to_notification).collect(),
        count,
    })
}

/// Remove a scheduled notification before it goes out.
pub async fn cancel_scheduled(actor: Actor, id: NotificationId, deps: &ServerDeps) -> ApiResult<()> {
    actor.can(Capability::ManageNotifications).check()?;

    if NotificationRecord::delete_unsent(id, &deps.db_pool).await?.is_none() {
        return match NotificationRecord::find_by_id(id, &deps.db_pool).await? {
            Some(_) => Err(ApiError::Conflict(
                "Notification has already been sent".to_string(),
            )),
            None => Err(ApiError::NotFound("Notification")),
        };
    }

    deps.stream_hub
        .publish_change(
            topics::NOTIFICATIONS,
            &ChangeEvent::<Notification>::delete("notifications", id.into_uuid()),
        )
        .await;
    info!(notification_id = %id, "scheduled notification cancelled");
    Ok(())
}

pub async fn mark_read(user_id: UserId, id: NotificationId, deps: &ServerDeps) -> ApiResult<Notification> {
    let record = NotificationRecord::mark_read(id, user_id, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Notification"))?;

    let notification = record.to_notification();
    deps.stream_hub
        .publish_change(
            topics::NOTIFICATIONS,
            &ChangeEvent::update("notifications", notification.id, &notification),
        )
        .await;
    Ok(notification)
}
