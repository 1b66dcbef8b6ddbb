//! Postcards exchanged between users.

mod repository;

pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ownership::Owned;
use crate::user::UserSummary;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "font_style", rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Handwritten,
    Modern,
    Vintage,
}

impl FontStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontStyle::Handwritten => "handwritten",
            FontStyle::Modern => "modern",
            FontStyle::Vintage => "vintage",
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "stamp", rename_all = "lowercase")]
pub enum Stamp {
    #[default]
    Classic,
    Travel,
    /// No stamp at all.
    #[serde(rename = "none")]
    #[sqlx(rename = "none")]
    Blank,
}

impl Stamp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stamp::Classic => "classic",
            Stamp::Travel => "travel",
            Stamp::Blank => "none",
        }
    }
}

/// Postcard as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct Postcard {
    pub id: Uuid,
    pub message: String,
    pub location: String,
    pub background_image: String,
    pub font_style: FontStyle,
    pub stamp: Stamp,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Only the sender may delete a postcard.
impl Owned for Postcard {
    const KIND: &'static str = "Postcard";

    fn owner_id(&self) -> Uuid {
        self.sender_id
    }
}

/// A [`Postcard`] with the other party attached.
///
/// Sent postcards carry their `recipient`, received ones their `sender`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostcardView {
    #[serde(flatten)]
    pub postcard: Postcard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_wire_format() {
        assert_eq!(
            serde_json::to_string(&Stamp::Blank).unwrap(),
            "\"none\""
        );
        assert_eq!(
            serde_json::from_str::<Stamp>("\"travel\"").unwrap(),
            Stamp::Travel
        );
        assert!(serde_json::from_str::<Stamp>("\"golden\"").is_err());
        assert_eq!(
            serde_json::from_str::<FontStyle>("\"vintage\"").unwrap(),
            FontStyle::Vintage
        );
        assert_eq!(Stamp::Blank.as_str(), "none");
    }

    #[test]
    fn test_view_flattens_postcard() {
        let view = PostcardView {
            postcard: Postcard {
                message: "Hello".into(),
                ..Default::default()
            },
            recipient: Some(UserSummary {
                username: "bob".into(),
                ..Default::default()
            }),
            sender: None,
        };
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["message"], "Hello");
        assert_eq!(json["fontStyle"], "handwritten");
        assert_eq!(json["recipient"]["username"], "bob");
        assert!(json.get("sender").is_none());
    }
}
