//! Community lore posts.

mod repository;

pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ownership::Owned;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "lore_type")]
pub enum LoreType {
    #[default]
    Historical,
    Cultural,
    Folklore,
}

impl std::str::FromStr for LoreType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Historical" => Ok(Self::Historical),
            "Cultural" => Ok(Self::Cultural),
            "Folklore" => Ok(Self::Folklore),
            _ => Err(()),
        }
    }
}

/// Lore as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct Lore {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: LoreType,
    pub content: String,
    pub image: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Lore {
    const KIND: &'static str = "Lore";

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Lore {
    /// Whether title, location or content contains `term`, ignoring case.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [&self.title, &self.location, &self.content]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Author of a [`Lore`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub username: String,
}

/// A [`Lore`] with its creator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoreView {
    #[serde(flatten)]
    pub lore: Lore,
    pub creator: Creator,
}
