use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row-level change kind streamed on a realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change for a table.
///
/// `record` carries the new row for inserts and updates and is absent for
/// deletes. `commit_timestamp` is assigned by the server when the change is
/// published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent<T> {
    pub table: String,
    pub kind: ChangeKind,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<T>,
    pub commit_timestamp: DateTime<Utc>,
}

impl<T> ChangeEvent<T> {
    pub fn insert(table: &str, id: Uuid, record: T) -> Self {
        Self::with_record(table, ChangeKind::Insert, id, record)
    }

    pub fn update(table: &str, id: Uuid, record: T) -> Self {
        Self::with_record(table, ChangeKind::Update, id, record)
    }

    pub fn delete(table: &str, id: Uuid) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Delete,
            id,
            record: None,
            commit_timestamp: Utc::now(),
        }
    }

    fn with_record(table: &str, kind: ChangeKind, id: Uuid, record: T) -> Self {
        Self {
            table: table.to_string(),
            kind,
            id,
            record: Some(record),
            commit_timestamp: Utc::now(),
        }
    }
}

/// Rows that can be reconciled against realtime events.
///
/// `version` is the server-side modification time when the row has one;
/// rows without it fall back to the event's commit timestamp.
pub trait Versioned {
    fn id(&self) -> Uuid;
    fn version(&self) -> Option<DateTime<Utc>>;
}

/// Realtime topic names.
pub mod topics {
    use uuid::Uuid;

    pub const NEWS: &str = "news";
    pub const NOTIFICATIONS: &str = "notifications";

    pub fn saved_articles(user_id: Uuid) -> String {
        format!("saved_articles:{}", user_id)
    }

    pub fn auth(user_id: Uuid) -> String {
        format!("auth:{}", user_id)
    }
}
