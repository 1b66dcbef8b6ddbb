use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::user::{Role, User};

/// Public listing entry.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub role: Role,
}

impl From<User> for Entry {
    fn from(user: User) -> Self {
        Entry {
            id: user.id,
            username: user.username,
            email: user.email,
            is_verified: user.is_verified,
            role: user.role,
        }
    }
}

/// List every user.
pub async fn handler(State(db): State<Database>) -> Result<Json<Vec<Entry>>> {
    let users = db.users.list().await?;
    Ok(Json(users.into_iter().map(Entry::from).collect()))
}
