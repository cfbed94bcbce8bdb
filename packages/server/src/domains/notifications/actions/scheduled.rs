//! Scheduled delivery, driven by the cron task and the HTTP trigger

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use newsdesk_shared::{realtime::topics, ChangeEvent, ProcessedNotification};
use tracing::{debug, info, warn};

use crate::domains::notifications::actions::deliver;
use crate::domains::notifications::models::NotificationRecord;
use crate::kernel::ServerDeps;

pub const NOTHING_SCHEDULED_MESSAGE: &str = "No scheduled notifications to process";

/// Deliver every pending notification whose time has passed.
///
/// Each row is claimed (its `sent_at` set) before any push goes out, so a
/// row is handled by exactly one run even when runs overlap. A failed claim
/// or push is reported for that row and the batch moves on; a failed push
/// leaves the row claimed.
pub async fn process_scheduled_notifications(deps: &ServerDeps) -> Result<Vec<ProcessedNotification>> {
    let due = NotificationRecord::find_due(Utc::now(), &deps.db_pool).await?;
    if due.is_empty() {
        debug!("no scheduled notifications due");
        return Ok(Vec::new());
    }

    info!(count = due.len(), "processing scheduled notifications");
    let mut processed = Vec::with_capacity(due.len());

    for pending in due {
        let record = match NotificationRecord::claim(pending.id, &deps.db_pool).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(notification_id = %pending.id, "already claimed by another run");
                continue;
            }
            Err(e) => {
                warn!(notification_id = %pending.id, error = %e, "failed to claim scheduled notification");
                processed.push(ProcessedNotification {
                    id: pending.id.into_uuid(),
                    success: false,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        deps.stream_hub
            .publish_change(
                topics::NOTIFICATIONS,
                &ChangeEvent::update("notifications", record.id.into_uuid(), record.to_notification()),
            )
            .await;

        let outcome = if record.notification_type.is_push() {
            deliver(&record, BTreeMap::new(), deps).await.map(|_| ())
        } else {
            Ok(())
        };

        processed.push(match outcome {
            Ok(()) => ProcessedNotification {
                id: record.id.into_uuid(),
                success: true,
                error: None,
            },
            Err(e) => {
                warn!(notification_id = %record.id, error = %e, "scheduled push failed");
                ProcessedNotification {
                    id: record.id.into_uuid(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        });
    }

    Ok(processed)
}
