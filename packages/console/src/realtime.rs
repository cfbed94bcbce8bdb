//! Reconcile locally held lists with realtime change events.
//!
//! Ordering is last-write-wins by server time: the row's own `version()`
//! when it has one, otherwise the event's commit timestamp.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use newsdesk_shared::{ChangeEvent, ChangeKind, Versioned};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

fn event_version<T: Versioned>(event: &ChangeEvent<T>) -> DateTime<Utc> {
    event
        .record
        .as_ref()
        .and_then(Versioned::version)
        .unwrap_or(event.commit_timestamp)
}

/// Merge one event into a list without any history.
///
/// Inserts for a known id and updates for an unknown id are treated as
/// upserts. An update whose row version is older than the held row's is
/// ignored. New rows go to the front.
pub fn apply_event<T: Versioned + Clone>(mut list: Vec<T>, event: &ChangeEvent<T>) -> Vec<T> {
    match event.kind {
        ChangeKind::Delete => list.retain(|row| row.id() != event.id),
        ChangeKind::Insert | ChangeKind::Update => {
            let Some(record) = event.record.as_ref() else {
                return list;
            };
            match list.iter().position(|row| row.id() == event.id) {
                Some(index) => {
                    let stale = match (list[index].version(), record.version()) {
                        (Some(held), Some(incoming)) => incoming < held,
                        _ => false,
                    };
                    if !stale {
                        list[index] = record.clone();
                    }
                }
                None => list.insert(0, record.clone()),
            }
        }
    }
    list
}

/// A list kept in sync with one realtime topic.
///
/// Remembers the version each row was last written at and when each id was
/// deleted, so an event that arrives late cannot resurrect or roll back a
/// row.
pub struct LiveList<T> {
    rows: Vec<T>,
    versions: HashMap<Uuid, DateTime<Utc>>,
    tombstones: HashMap<Uuid, DateTime<Utc>>,
    filter: Option<Box<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T: Versioned + Clone> LiveList<T> {
    /// Start from a freshly fetched page.
    pub fn new(rows: Vec<T>) -> Self {
        let mut list = Self {
            rows: Vec::new(),
            versions: HashMap::new(),
            tombstones: HashMap::new(),
            filter: None,
        };
        list.replace(rows);
        list
    }

    /// Keep only rows matching `filter`; rows that stop matching are removed.
    pub fn with_filter(mut self, filter: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.rows.retain(|row| filter(row));
        self.filter = Some(Box::new(filter));
        self
    }

    /// Replace contents after a refetch.
    ///
    /// The fresh page already reflects every delete older than its oldest
    /// row, so those tombstones are dropped, along with tombstones for ids
    /// the page brings back.
    pub fn replace(&mut self, rows: Vec<T>) {
        self.versions.clear();
        self.rows = rows
            .into_iter()
            .filter(|row| self.filter.as_ref().map_or(true, |f| f(row)))
            .collect();
        for row in &self.rows {
            if let Some(version) = row.version() {
                self.versions.insert(row.id(), version);
            }
        }

        let present: HashSet<Uuid> = self.rows.iter().map(|row| row.id()).collect();
        let floor = self.versions.values().min().copied();
        let before = self.tombstones.len();
        self.tombstones.retain(|id, deleted_at| {
            !present.contains(id) && floor.is_some_and(|floor| *deleted_at >= floor)
        });
        if self.tombstones.len() != before {
            debug!(pruned = before - self.tombstones.len(), "pruned tombstones");
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.rows.iter().find(|row| row.id() == id)
    }

    /// Apply one event. Returns whether the visible rows changed.
    pub fn apply(&mut self, event: &ChangeEvent<T>) -> bool {
        let version = event_version(event);

        if let Some(deleted_at) = self.tombstones.get(&event.id) {
            if version <= *deleted_at {
                debug!(id = %event.id, "ignoring event older than delete");
                return false;
            }
        }

        match event.kind {
            ChangeKind::Delete => {
                self.tombstones.insert(event.id, version);
                self.versions.remove(&event.id);
                let before = self.rows.len();
                self.rows.retain(|row| row.id() != event.id);
                before != self.rows.len()
            }
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(record) = event.record.as_ref() else {
                    return false;
                };
                if let Some(held) = self.versions.get(&event.id) {
                    if version < *held {
                        debug!(id = %event.id, "ignoring stale update");
                        return false;
                    }
                }
                self.tombstones.remove(&event.id);
                self.versions.insert(event.id, version);

                let matches = self.filter.as_ref().map_or(true, |f| f(record));
                let position = self.rows.iter().position(|row| row.id() == event.id);
                match (position, matches) {
                    (Some(index), true) => {
                        self.rows[index] = record.clone();
                        true
                    }
                    (Some(index), false) => {
                        self.rows.remove(index);
                        true
                    }
                    (None, true) => {
                        self.rows.insert(0, record.clone());
                        true
                    }
                    (None, false) => false,
                }
            }
        }
    }

    /// Apply the JSON payload of one stream frame.
    pub fn apply_json(&mut self, data: &str) -> Result<bool, ClientError>
    where
        T: DeserializeOwned,
    {
        let event: ChangeEvent<T> = serde_json::from_str(data)?;
        Ok(self.apply(&event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use newsdesk_shared::{NewsArticle, NewsStatus};

    fn article(title: &str, updated_at: DateTime<Utc>) -> NewsArticle {
        NewsArticle {
            id: Uuid::new_v4(),
            title: title.to_string(),
            summary: "summary".to_string(),
            content: None,
            image_path: None,
            source_url: None,
            source_name: None,
            source_icon: None,
            category_id: None,
            status: NewsStatus::Published,
            created_by: None,
            view_count: 0,
            created_at: updated_at,
            updated_at,
        }
    }

    fn at(event: ChangeEvent<NewsArticle>, ts: DateTime<Utc>) -> ChangeEvent<NewsArticle> {
        ChangeEvent {
            commit_timestamp: ts,
            ..event
        }
    }

    #[test]
    fn insert_goes_to_front_and_known_id_is_updated() {
        let t0 = Utc::now();
        let first = article("first", t0);
        let list = vec![first.clone()];

        let second = article("second", t0);
        let list = apply_event(list, &ChangeEvent::insert("news", second.id, second.clone()));
        assert_eq!(list[0].id, second.id);

        let mut renamed = first.clone();
        renamed.title = "renamed".to_string();
        renamed.updated_at = t0 + Duration::seconds(1);
        let list = apply_event(list, &ChangeEvent::insert("news", first.id, renamed));
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].title, "renamed");
    }

    #[test]
    fn older_update_does_not_overwrite() {
        let t0 = Utc::now();
        let held = article("new title", t0);
        let mut old = held.clone();
        old.title = "old title".to_string();
        old.updated_at = t0 - Duration::seconds(5);

        let list = apply_event(vec![held.clone()], &ChangeEvent::update("news", held.id, old));
        assert_eq!(list[0].title, "new title");
    }

    #[test]
    fn update_for_unknown_id_is_inserted_and_delete_removes() {
        let row = article("late", Utc::now());
        let list = apply_event(Vec::new(), &ChangeEvent::update("news", row.id, row.clone()));
        assert_eq!(list.len(), 1);

        let list = apply_event(list, &ChangeEvent::<NewsArticle>::delete("news", row.id));
        assert!(list.is_empty());
    }

    #[test]
    fn delete_is_not_undone_by_older_update() {
        let t0 = Utc::now();
        let row = article("doomed", t0);
        let mut list = LiveList::new(vec![row.clone()]);

        let delete = at(ChangeEvent::delete("news", row.id), t0 + Duration::seconds(2));
        assert!(list.apply(&delete));
        assert!(list.is_empty());

        let mut late = row.clone();
        late.updated_at = t0 + Duration::seconds(1);
        assert!(!list.apply(&ChangeEvent::update("news", row.id, late)));
        assert!(list.is_empty());

        let mut recreated = row.clone();
        recreated.updated_at = t0 + Duration::seconds(3);
        assert!(list.apply(&ChangeEvent::insert("news", row.id, recreated)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn filter_drops_rows_that_stop_matching() {
        let t0 = Utc::now();
        let row = article("live", t0);
        let mut list = LiveList::new(vec![row.clone()])
            .with_filter(|a: &NewsArticle| a.status == NewsStatus::Published);

        let mut unpublished = row.clone();
        unpublished.status = NewsStatus::Draft;
        unpublished.updated_at = t0 + Duration::seconds(1);
        assert!(list.apply(&ChangeEvent::update("news", row.id, unpublished)));
        assert!(list.get(row.id).is_none());

        let draft = {
            let mut a = article("draft", t0);
            a.status = NewsStatus::Draft;
            a
        };
        assert!(!list.apply(&ChangeEvent::insert("news", draft.id, draft)));
    }

    #[test]
    fn applies_stream_json() {
        let row = article("from stream", Utc::now());
        let payload = serde_json::to_string(&ChangeEvent::insert("news", row.id, row.clone())).unwrap();

        let mut list: LiveList<NewsArticle> = LiveList::new(Vec::new());
        assert!(list.apply_json(&payload).unwrap());
        assert_eq!(list.rows()[0].title, "from stream");
        assert!(list.apply_json("{not json").is_err());
    }

    #[test]
    fn refetch_prunes_tombstones_the_page_covers() {
        let t0 = Utc::now();
        let old = article("old", t0);
        let recent = article("recent", t0);
        let mut list = LiveList::new(vec![old.clone(), recent.clone()]);

        list.apply(&at(ChangeEvent::delete("news", old.id), t0 + Duration::seconds(2)));
        list.apply(&at(ChangeEvent::delete("news", recent.id), t0 + Duration::seconds(10)));
        assert_eq!(list.tombstones.len(), 2);

        let survivor = article("survivor", t0 + Duration::seconds(5));
        list.replace(vec![survivor]);
        assert_eq!(list.tombstones.len(), 1);
        assert!(list.tombstones.contains_key(&recent.id));

        let mut late = recent.clone();
        late.updated_at = t0 + Duration::seconds(9);
        assert!(!list.apply(&ChangeEvent::update("news", recent.id, late)));

        list.replace(Vec::new());
        assert!(list.tombstones.is_empty());
    }
}
