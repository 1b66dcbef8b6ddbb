mod builder;
mod repository;
mod service;

pub use builder::*;
pub use repository::*;
pub use service::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a [`User`] in the community.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Regulars,
    Professionals,
    Natives,
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGULARS" => Ok(Self::Regulars),
            "PROFESSIONALS" => Ok(Self::Professionals),
            "NATIVES" => Ok(Self::Natives),
            _ => Err(()),
        }
    }
}

/// User as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub is_verified: bool,
    #[serde(skip)]
    pub otp: Option<String>,
    #[serde(skip)]
    pub otp_expires: Option<DateTime<Utc>>,
    pub role: Role,
    pub location: Option<String>,
    pub description: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_image: Option<String>,
    pub countries_visited: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public subset of a [`User`], embedded in other resources.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    /// Up to three latest visited countries, most recent first.
    pub fn recent_destinations(&self) -> Vec<String> {
        self.countries_visited.iter().rev().take(3).cloned().collect()
    }
}

/// Identity of the other party on a postcard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}
