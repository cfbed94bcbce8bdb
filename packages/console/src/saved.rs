//! Helpers over the user's saved-article list.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use newsdesk_shared::SavedArticle;
use uuid::Uuid;

pub fn is_article_saved(saved: &[SavedArticle], article_id: Uuid) -> bool {
    saved.iter().any(|s| s.article_id == article_id)
}

/// The saved row for an article, used to unsave or toggle read.
pub fn saved_by_article_id(saved: &[SavedArticle], article_id: Uuid) -> Option<&SavedArticle> {
    saved.iter().find(|s| s.article_id == article_id)
}

pub fn sort_newest_first(saved: &mut [SavedArticle]) {
    saved.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
}

/// Group by UTC day, newest day first and newest first within a day.
pub fn group_by_day(saved: &[SavedArticle]) -> Vec<(NaiveDate, Vec<SavedArticle>)> {
    let mut days: BTreeMap<NaiveDate, Vec<SavedArticle>> = BTreeMap::new();
    for item in saved {
        days.entry(item.saved_at.date_naive())
            .or_default()
            .push(item.clone());
    }
    days.into_iter()
        .rev()
        .map(|(day, mut items)| {
            sort_newest_first(&mut items);
            (day, items)
        })
        .collect()
}

pub fn unread_count(saved: &[SavedArticle]) -> usize {
    saved.iter().filter(|s| !s.is_read).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn saved_at(at: DateTime<Utc>) -> SavedArticle {
        SavedArticle {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            article_id: Uuid::new_v4(),
            is_read: false,
            saved_at: at,
            article: None,
        }
    }

    #[test]
    fn lookup_by_article() {
        let item = saved_at(Utc::now());
        let list = vec![item.clone()];
        assert!(is_article_saved(&list, item.article_id));
        assert!(!is_article_saved(&list, Uuid::new_v4()));
        assert_eq!(saved_by_article_id(&list, item.article_id).map(|s| s.id), Some(item.id));
    }

    #[test]
    fn groups_newest_day_first() {
        let monday_morning = saved_at(Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap());
        let monday_evening = saved_at(Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap());
        let tuesday = saved_at(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());

        let groups = group_by_day(&[monday_morning.clone(), tuesday.clone(), monday_evening.clone()]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(groups[1].1[0].id, monday_evening.id);
        assert_eq!(groups[1].1[1].id, monday_morning.id);
    }

    #[test]
    fn counts_unread() {
        let mut read = saved_at(Utc::now());
        read.is_read = true;
        assert_eq!(unread_count(&[read, saved_at(Utc::now())]), 1);
    }
}
