use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::realtime::Versioned;
use crate::validation::FormErrors;

/// Category-based subscriber cohort used to target notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "notification_audience", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    #[default]
    All,
    Education,
    Visa,
    Scholarship,
    Course,
    Immigration,
    Individual,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::All => "all",
            Audience::Education => "education",
            Audience::Visa => "visa",
            Audience::Scholarship => "scholarship",
            Audience::Course => "course",
            Audience::Immigration => "immigration",
            Audience::Individual => "individual",
        }
    }
}

/// Delivery surface of a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "notification_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Web,
    #[default]
    Mobile,
    Both,
}

impl NotificationType {
    /// Whether this notification goes out through the push gateway.
    pub fn is_push(&self) -> bool {
        matches!(self, NotificationType::Mobile | NotificationType::Both)
    }
}

fn default_true() -> bool {
    true
}

/// Per-profile notification settings, stored as JSON on the profile row.
///
/// Older rows used `push` instead of `push_enabled`; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true", alias = "push")]
    pub push_enabled: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            push_enabled: true,
            email: false,
            subscriptions: Vec::new(),
            fcm_token: None,
        }
    }
}

impl NotificationPreferences {
    /// Device token to push to, if push is enabled and a token is registered.
    pub fn deliverable_token(&self) -> Option<&str> {
        if !self.push_enabled {
            return None;
        }
        self.fcm_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn is_subscribed_to(&self, audience: Audience) -> bool {
        audience == Audience::All || self.subscriptions.iter().any(|s| s == audience.as_str())
    }
}

/// Partial preference update; only provided fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub push_enabled: Option<bool>,
    #[serde(default)]
    pub email: Option<bool>,
    #[serde(default)]
    pub subscriptions: Option<Vec<String>>,
}

impl PreferencesUpdate {
    pub fn apply(&self, current: &NotificationPreferences) -> NotificationPreferences {
        NotificationPreferences {
            push_enabled: self.push_enabled.unwrap_or(current.push_enabled),
            email: self.email.unwrap_or(current.email),
            subscriptions: self
                .subscriptions
                .clone()
                .unwrap_or_else(|| current.subscriptions.clone()),
            fcm_token: current.fcm_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTokenUpdate {
    pub fcm_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub audience: Audience,
    pub target_audience: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub user_id: Option<Uuid>,
    pub link_to_article: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_scheduled(&self) -> bool {
        self.sent_at.is_none() && self.scheduled_for.is_some()
    }
}

impl Versioned for Notification {
    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Composition form for a notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub link_to_article: Option<String>,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub schedule_later: bool,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
}

pub fn validate_notification_draft(draft: &NotificationDraft, now: DateTime<Utc>) -> FormErrors {
    let mut errors = FormErrors::new();

    if draft.title.trim().is_empty() {
        errors.add("title", "Title is required");
    }
    if draft.body.trim().is_empty() {
        errors.add("body", "Body is required");
    }
    if draft.audience == Audience::Individual && draft.user_id.is_none() {
        errors.add("user_id", "A recipient is required for individual notifications");
    }
    if draft.schedule_later {
        match draft.scheduled_time {
            None => errors.add("scheduled_time", "Scheduled time is required"),
            Some(at) if at <= now => {
                errors.add("scheduled_time", "Scheduled time must be in the future")
            }
            Some(_) => {}
        }
    }

    errors
}

/// Body of `POST /functions/send-push-notification`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPushRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub audience: Option<Audience>,
    #[serde(default)]
    pub data: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub link_to_article: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPushResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedNotification {
    pub id: Uuid,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessScheduledResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<Vec<ProcessedNotification>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub count: i64,
}
