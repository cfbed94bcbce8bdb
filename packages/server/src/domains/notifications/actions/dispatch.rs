//! Push fan-out for a single notification

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use newsdesk_shared::{
    realtime::topics, Audience, ChangeEvent, NotificationType, SendPushRequest, SendPushResponse,
};
use tracing::{info, warn};

use crate::common::{Actor, ApiError, ApiResult, Capability, UserId};
use crate::domains::notifications::models::{NewNotification, NotificationRecord};
use crate::domains::notifications::recipients::{resolve_push_tokens, Recipients};
use crate::kernel::{PushMessage, ServerDeps};

pub const NO_RECIPIENTS_MESSAGE: &str = "No recipients found with valid FCM tokens";

/// Result of pushing one notification row.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipients: usize,
    /// Raw gateway response; `None` when nobody had a token
    pub gateway_response: Option<serde_json::Value>,
}

/// Push an existing notification row to its recipients.
pub async fn deliver(
    record: &NotificationRecord,
    extra_data: BTreeMap<String, String>,
    deps: &ServerDeps,
) -> Result<Delivery> {
    let recipients = match (record.user_id, record.audience) {
        (Some(user_id), _) => Recipients::User(user_id),
        (None, audience) => Recipients::Audience(audience),
    };
    let tokens = resolve_push_tokens(recipients, &deps.db_pool).await?;
    if tokens.is_empty() {
        info!(notification_id = %record.id, "no push recipients");
        return Ok(Delivery {
            recipients: 0,
            gateway_response: None,
        });
    }

    let message = PushMessage {
        title: record.title.clone(),
        body: record.body.clone(),
        data: push_data(record, extra_data),
    };
    let response = deps.push_gateway.send(&tokens, &message).await?;

    info!(notification_id = %record.id, recipients = tokens.len(), "push delivered");
    Ok(Delivery {
        recipients: tokens.len(),
        gateway_response: Some(response),
    })
}

fn push_data(
    record: &NotificationRecord,
    mut data: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    data.insert("notificationId".to_string(), record.id.to_string());
    if let Some(link) = &record.link_to_article {
        data.insert("linkToArticle".to_string(), link.clone());
    }
    data
}

/// Send a push right away to a user or an audience.
///
/// Nothing is recorded when no recipient has a usable token. Otherwise a
/// sent `mobile` row is stored first so the device payload can reference it.
pub async fn send_push_notification(
    actor: Actor,
    request: SendPushRequest,
    deps: &ServerDeps,
) -> ApiResult<SendPushResponse> {
    let actor = actor.can(Capability::ManageNotifications).check()?;

    if request.title.trim().is_empty() || request.body.trim().is_empty() {
        return Err(ApiError::bad_request("Title and body are required"));
    }

    let user_id = request.user_id.map(UserId::from_uuid);
    let recipients = Recipients::from_target(user_id, request.audience);
    let tokens = resolve_push_tokens(recipients, &deps.db_pool).await?;
    if tokens.is_empty() {
        info!(?recipients, "push skipped, no recipients");
        return Ok(SendPushResponse {
            success: true,
            message: Some(NO_RECIPIENTS_MESSAGE.to_string()),
            fcm_result: None,
            notification_id: None,
        });
    }

    let audience = match recipients {
        Recipients::User(_) => Audience::Individual,
        Recipients::Audience(audience) => audience,
    };
    let record = NotificationRecord::create(
        &NewNotification {
            title: request.title.clone(),
            body: request.body.clone(),
            audience,
            notification_type: NotificationType::Mobile,
            user_id,
            link_to_article: request.link_to_article.clone(),
            scheduled_for: None,
            sent_at: Some(Utc::now()),
            created_by: Some(actor.user_id()),
            idempotency_key: None,
        },
        &deps.db_pool,
    )
    .await?
    .ok_or_else(|| ApiError::Conflict("Notification already exists".to_string()))?;

    deps.stream_hub
        .publish_change(
            topics::NOTIFICATIONS,
            &ChangeEvent::insert("notifications", record.id.into_uuid(), record.to_notification()),
        )
        .await;

    let message = PushMessage {
        title: record.title.clone(),
        body: record.body.clone(),
        data: push_data(&record, request.data.unwrap_or_default()),
    };
    let fcm_result = deps.push_gateway.send(&tokens, &message).await.map_err(|e| {
        warn!(notification_id = %record.id, error = %e, "push send failed");
        ApiError::Internal(e)
    })?;

    info!(notification_id = %record.id, recipients = tokens.len(), "push sent");
    Ok(SendPushResponse {
        success: true,
        message: None,
        fcm_result: Some(fcm_result),
        notification_id: Some(record.id.into_uuid()),
    })
}
