//! Profile of the authenticated user.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::Valid;
use crate::token::Claims;
use crate::user::{Role, User};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub journal_entries: i64,
    pub postcards_sent: i64,
    pub countries_visited: usize,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub location: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_image: Option<String>,
    pub countries_visited: Vec<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub stats: Stats,
}

async fn current(state: &AppState, claims: &Claims) -> Result<User> {
    state
        .db
        .users
        .find_by_id(claims.id)
        .await?
        .ok_or(ServerError::NotFound("User"))
}

/// Handler to get the caller profile with its counters.
pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>> {
    let user = current(&state, &claims).await?;

    let journal_entries = state.db.journals.count_by_user(user.id).await?;
    let postcards_sent = state.db.postcards.count_sent(user.id).await?;

    Ok(Json(Profile {
        stats: Stats {
            journal_entries,
            postcards_sent,
            countries_visited: user.countries_visited.len(),
        },
        id: user.id,
        username: user.username,
        email: user.email,
        location: user.location,
        profile_picture: user.profile_picture,
        cover_image: user.cover_image,
        countries_visited: user.countries_visited,
        description: user.description,
        created_at: user.created_at,
    }))
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    #[validate(length(max = 100, message = "Location is too long."))]
    pub location: Option<String>,
    #[validate(length(max = 500, message = "Description is too long."))]
    pub description: Option<String>,
    #[validate(url(message = "Profile picture must be an URL."))]
    pub profile_picture: Option<String>,
    #[validate(url(message = "Cover image must be an URL."))]
    pub cover_image: Option<String>,
    pub countries_visited: Option<Vec<String>>,
}

/// Handler to update profile fields. Absent fields are kept.
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Valid(body): Valid<UpdateBody>,
) -> Result<Json<User>> {
    let mut user = current(&state, &claims).await?;

    if let Some(location) = body.location {
        user.location = Some(location);
    }
    if let Some(description) = body.description {
        user.description = Some(description);
    }
    if let Some(picture) = body.profile_picture {
        user.profile_picture = Some(picture);
    }
    if let Some(cover) = body.cover_image {
        user.cover_image = Some(cover);
    }
    if let Some(countries) = body.countries_visited {
        user.countries_visited = countries;
    }
    user.updated_at = state.clock.now();

    state.db.users.update(&user).await?;

    Ok(Json(user))
}

/// Anything but a known role name is rejected, so `role` stays untyped.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleBody {
    pub role: Value,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub message: String,
    pub role: Role,
}

/// Handler to change the caller role.
pub async fn role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: std::result::Result<Json<RoleBody>, JsonRejection>,
) -> Result<Json<RoleResponse>> {
    let Json(body) = body?;
    let role: Role = body
        .role
        .as_str()
        .and_then(|role| role.parse().ok())
        .ok_or_else(|| ServerError::BadRequest("Invalid role.".into()))?;

    let mut user = current(&state, &claims).await?;
    user.role = role;
    user.updated_at = state.clock.now();
    state.db.users.update(&user).await?;

    tracing::info!(user_id = %user.id, ?role, "role updated");

    Ok(Json(RoleResponse {
        message: "Role updated.".into(),
        role,
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destinations {
    pub countries_visited: Vec<String>,
}

pub async fn destinations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Destinations>> {
    let user = current(&state, &claims).await?;

    Ok(Json(Destinations {
        countries_visited: user.countries_visited,
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentDestinations {
    pub recent_destinations: Vec<String>,
}

pub async fn recent_destinations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RecentDestinations>> {
    let user = current(&state, &claims).await?;

    Ok(Json(RecentDestinations {
        recent_destinations: user.recent_destinations(),
    }))
}
