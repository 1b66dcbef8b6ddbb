//! Travel journal entries.

mod repository;

pub use repository::*;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ownership::Owned;

/// Number of entries returned by [`JournalRepository::recent`].
pub const RECENT_LIMIT: i64 = 3;

/// Journal entry as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct Journal {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub location: String,
    pub journal_entry: String,
    pub photos: Vec<String>,
    pub tags: Vec<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Journal {
    const KIND: &'static str = "Journal";

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Partial update of a [`Journal`]. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalChanges {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub journal_entry: Option<String>,
    pub photos: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl Journal {
    /// Apply `changes`, stamping `updated_at`.
    pub fn apply(&mut self, changes: JournalChanges, now: DateTime<Utc>) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(date) = changes.date {
            self.date = date;
        }
        if let Some(location) = changes.location {
            self.location = location;
        }
        if let Some(entry) = changes.journal_entry {
            self.journal_entry = entry;
        }
        if let Some(photos) = changes.photos {
            self.photos = photos;
        }
        if let Some(tags) = changes.tags {
            self.tags = tags;
        }
        self.updated_at = now;
    }

    /// Whether any tag of `self` is in `tags`.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }
}

/// Split a `tags` query parameter such as `beach,food`.
///
/// Blank items are dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_changes() {
        let now = Utc::now();
        let mut journal = Journal {
            title: "Lisbon".into(),
            location: "Portugal".into(),
            tags: vec!["food".into()],
            ..Default::default()
        };

        journal.apply(
            JournalChanges {
                title: Some("Porto".into()),
                tags: Some(vec![]),
                ..Default::default()
            },
            now,
        );

        assert_eq!(journal.title, "Porto");
        assert_eq!(journal.location, "Portugal");
        assert!(journal.tags.is_empty());
        assert_eq!(journal.updated_at, now);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("beach, food,,"), vec!["beach", "food"]);
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn test_tag_overlap() {
        let journal = Journal {
            tags: vec!["beach".into(), "sun".into()],
            ..Default::default()
        };

        assert!(journal.has_any_tag(&["food".into(), "sun".into()]));
        assert!(!journal.has_any_tag(&["food".into()]));
        assert!(!Journal::default().has_any_tag(&["sun".into()]));
    }

    #[test]
    fn test_serialized_fields() {
        let journal = Journal {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            ..Default::default()
        };
        let json = serde_json::to_value(&journal).unwrap();

        assert_eq!(json["date"], "2024-05-01");
        assert!(json.get("journalEntry").is_some());
        assert!(json.get("userId").is_some());
    }
}
