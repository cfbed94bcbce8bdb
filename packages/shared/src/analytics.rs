use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "event_type", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    View,
    Share,
    Save,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEventInput {
    pub article_id: Uuid,
    pub event_type: EventType,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub article_id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: EventType,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Event counts for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStats {
    pub article_id: Uuid,
    pub views: i64,
    pub shares: i64,
    pub saves: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopArticle {
    pub article_id: Uuid,
    pub title: String,
    pub view_count: i32,
}
